//! Shared helpers for integration tests.

use std::fs;
use std::path::Path;

/// Write a descriptor file into the mappings directory.
pub fn write_descriptor(dir: &Path, file: &str, xml: &str) {
    fs::write(dir.join(file), xml).unwrap();
}

/// Descriptor with one numeric-id endpoint on the given backend host.
pub fn accounts_descriptor(version: &str, host: &str) -> String {
    format!(
        r#"<mappings version="{version}">
    <backend host="{host}" port="8080"/>
    <endpoints>
        <endpoint method="GET" externalEndpoint="/accounts/{{id}}" varName="id" varExpression="[0-9]+"
                  action="logAction"/>
        <endpoint method="GET" externalEndpoint="/accounts"/>
    </endpoints>
    <actions>
        <action name="logAction" className="com.example.LogAction"/>
    </actions>
    <errors>
        <error status="404" message="Unknown account"/>
    </errors>
</mappings>
"#
    )
}

/// Descriptor whose endpoints all point at `host`, one per path in `paths`.
#[allow(dead_code)]
pub fn many_endpoints_descriptor(version: &str, host: &str, paths: &[&str]) -> String {
    let endpoints: String = paths
        .iter()
        .map(|p| format!(r#"<endpoint method="GET" externalEndpoint="{p}"/>"#))
        .collect();
    format!(
        r#"<mappings version="{version}">
    <backend host="{host}" port="80"/>
    <endpoints>{endpoints}</endpoints>
</mappings>
"#
    )
}
