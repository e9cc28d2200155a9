use atlas_api_generator::convert::spec_to_commands;
use atlas_api_generator::spec::parse_spec;
use chrono::NaiveDate;

fn now() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
}

fn cluster_spec(watcher_block: &str) -> String {
    format!(
        r#"
openapi: 3.0.0
info:
  title: t
  version: "2.0"
tags:
  - name: Clusters
paths:
  /api/atlas/v2/groups/{{groupId}}/clusters:
    post:
      operationId: createCluster
      tags: [Clusters]
      x-xgen-atlascli:
        watcher:
{watcher_block}
      parameters:
        - $ref: '#/components/parameters/groupId'
      requestBody:
        content:
          application/vnd.atlas.2023-01-01+json:
            schema:
              type: object
      responses:
        '201':
          description: Created
          content:
            application/vnd.atlas.2023-01-01+json: {{}}
  /api/atlas/v2/groups/{{groupId}}/clusters/{{clusterName}}:
    get:
      operationId: getCluster
      tags: [Clusters]
      parameters:
        - $ref: '#/components/parameters/groupId'
        - name: clusterName
          in: path
          required: true
          schema:
            type: string
      responses:
        '200':
          description: OK
          content:
            application/vnd.atlas.2023-01-01+json: {{}}
components:
  parameters:
    groupId:
      name: groupId
      in: path
      required: true
      schema:
        type: string
"#
    )
}

#[test]
fn test_valid_watcher_passes() {
    let yaml = cluster_spec(
        r#"          get:
            operation-id: getCluster
            version: "2023-01-01"
            params:
              groupId: input:groupId
              clusterName: body:$.name"#,
    );
    let spec = parse_spec(&yaml, false).unwrap();
    spec_to_commands(now(), &spec).unwrap();
}

#[test]
fn test_watcher_without_version_skips_version_check() {
    let yaml = cluster_spec(
        r#"          get:
            operation-id: getCluster
            params:
              groupId: input:groupId
              clusterName: body:$.name"#,
    );
    let spec = parse_spec(&yaml, false).unwrap();
    spec_to_commands(now(), &spec).unwrap();
}

#[test]
fn test_watcher_unknown_operation_fails() {
    let yaml = cluster_spec(
        r#"          get:
            operation-id: getFlexCluster
            params:
              groupId: input:groupId"#,
    );
    let spec = parse_spec(&yaml, false).unwrap();
    let err = spec_to_commands(now(), &spec).unwrap_err().to_string();
    assert!(err.contains("watcher for operationID='createCluster' is invalid"));
    assert!(err.contains("'getFlexCluster' was not found"));
}

#[test]
fn test_watcher_unknown_version_fails() {
    let yaml = cluster_spec(
        r#"          get:
            operation-id: getCluster
            version: "2020-01-01"
            params:
              groupId: input:groupId
              clusterName: body:$.name"#,
    );
    let spec = parse_spec(&yaml, false).unwrap();
    let err = spec_to_commands(now(), &spec).unwrap_err().to_string();
    assert!(err.contains("the version '2020-01-01' was not found"));
}

#[test]
fn test_watcher_unknown_parameter_fails() {
    let yaml = cluster_spec(
        r#"          get:
            operation-id: getCluster
            params:
              groupid: input:groupId
              clusterName: body:$.name"#,
    );
    let spec = parse_spec(&yaml, false).unwrap();
    let err = spec_to_commands(now(), &spec).unwrap_err().to_string();
    assert!(err.contains("parameter does not exist: 'groupid'"));
}

#[test]
fn test_watcher_missing_required_parameter_fails() {
    let yaml = cluster_spec(
        r#"          get:
            operation-id: getCluster
            params:
              clusterName: body:$.name"#,
    );
    let spec = parse_spec(&yaml, false).unwrap();
    let err = spec_to_commands(now(), &spec).unwrap_err().to_string();
    assert!(err.contains("required parameter(s) are missing: 'groupId'"));
}

#[test]
fn test_malformed_watcher_fails_during_extraction() {
    let yaml = cluster_spec(
        r#"          get:
            operation-id: """#,
    );
    let spec = parse_spec(&yaml, false).unwrap();
    let err = spec_to_commands(now(), &spec).unwrap_err();
    assert!(format!("{err:#}").contains("operation-id"));
}

#[test]
fn test_all_watcher_errors_are_reported_together() {
    let yaml = r#"
openapi: 3.0.0
info:
  title: t
  version: "2.0"
tags:
  - name: Clusters
paths:
  /api/atlas/v2/a:
    post:
      operationId: opA
      tags: [Clusters]
      x-xgen-atlascli:
        watcher:
          get:
            operation-id: missingOne
      requestBody:
        content:
          application/vnd.atlas.2023-01-01+json:
            schema:
              type: object
      responses:
        '201':
          description: Created
          content:
            application/vnd.atlas.2023-01-01+json: {}
  /api/atlas/v2/b:
    post:
      operationId: opB
      tags: [Clusters]
      x-xgen-atlascli:
        watcher:
          get:
            operation-id: missingTwo
      requestBody:
        content:
          application/vnd.atlas.2023-01-01+json:
            schema:
              type: object
      responses:
        '201':
          description: Created
          content:
            application/vnd.atlas.2023-01-01+json: {}
"#;
    let spec = parse_spec(yaml, false).unwrap();
    let err = spec_to_commands(now(), &spec).unwrap_err().to_string();
    assert!(err.contains("missingOne"));
    assert!(err.contains("missingTwo"));
}
