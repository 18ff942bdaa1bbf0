//! Descriptor parsing.
//!
//! # Responsibilities
//! - Deserialize one XML unit into raw records (quick-xml + serde)
//! - Build the action, filter and error maps
//! - Apply the default backend to endpoints without an override
//! - Reject dangling action/filter references
//!
//! # Design Decisions
//! - Repeated action/filter/error names: last one wins unless strict mode is on
//! - `action` may list several comma-separated names; order is kept
//! - Pattern validity is checked later by the pattern compiler

use std::collections::HashMap;

use axum::http::Method;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::mapping::descriptor::{Backend, EndpointSpec, MappingDescriptor, PathVariable};
use crate::mapping::source::SourceUnit;

/// Parser behaviour switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Reject repeated names instead of letting the last one win.
    pub strict_duplicates: bool,
}

#[derive(Debug, Deserialize)]
struct RawMappings {
    #[serde(rename = "@version")]
    version: Option<String>,
    backend: Option<RawBackend>,
    endpoints: Option<RawEndpoints>,
    actions: Option<RawActions>,
    filters: Option<RawFilters>,
    errors: Option<RawErrors>,
}

#[derive(Debug, Deserialize)]
struct RawBackend {
    #[serde(rename = "@host")]
    host: Option<String>,
    #[serde(rename = "@port")]
    port: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawEndpoints {
    #[serde(rename = "endpoint", default)]
    items: Vec<RawEndpoint>,
}

#[derive(Debug, Deserialize)]
struct RawEndpoint {
    #[serde(rename = "@method")]
    method: Option<String>,
    #[serde(rename = "@externalEndpoint")]
    external: Option<String>,
    #[serde(rename = "@internalEndpoint")]
    internal: Option<String>,
    #[serde(rename = "@varName")]
    var_name: Option<String>,
    #[serde(rename = "@varExpression")]
    var_expression: Option<String>,
    #[serde(rename = "@action")]
    action: Option<String>,
    #[serde(rename = "@filter")]
    filter: Option<String>,
    #[serde(rename = "@scope")]
    scope: Option<String>,
    #[serde(rename = "@backendHost")]
    backend_host: Option<String>,
    #[serde(rename = "@backendPort")]
    backend_port: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawActions {
    #[serde(rename = "action", default)]
    items: Vec<RawNamed>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFilters {
    #[serde(rename = "filter", default)]
    items: Vec<RawNamed>,
}

#[derive(Debug, Deserialize)]
struct RawNamed {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@className")]
    class_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawErrors {
    #[serde(rename = "error", default)]
    items: Vec<RawError>,
}

#[derive(Debug, Deserialize)]
struct RawError {
    #[serde(rename = "@status")]
    status: Option<String>,
    #[serde(rename = "@message")]
    message: Option<String>,
}

/// Parse one source unit into a descriptor.
pub fn parse(unit: &SourceUnit, options: ParseOptions) -> Result<MappingDescriptor, ConfigError> {
    let raw: RawMappings =
        quick_xml::de::from_str(&unit.content).map_err(|e| ConfigError::Malformed {
            unit: unit.id.clone(),
            detail: e.to_string(),
        })?;
    Parser {
        unit: &unit.id,
        options,
    }
    .build(raw)
}

struct Parser<'a> {
    unit: &'a str,
    options: ParseOptions,
}

impl Parser<'_> {
    fn build(&self, raw: RawMappings) -> Result<MappingDescriptor, ConfigError> {
        let version = non_empty(raw.version).ok_or_else(|| self.missing("`version` attribute"))?;
        let raw_endpoints = raw.endpoints.ok_or_else(|| self.missing("<endpoints> section"))?;

        let default_backend = raw.backend.map(|b| self.backend(b.host, b.port)).transpose()?;
        let actions = self.named_map("action", raw.actions.unwrap_or_default().items)?;
        let filters = self.named_map("filter", raw.filters.unwrap_or_default().items)?;
        let errors = self.errors(raw.errors.unwrap_or_default().items)?;

        let endpoints = raw_endpoints
            .items
            .into_iter()
            .enumerate()
            .map(|(index, ep)| {
                self.endpoint(index, ep, default_backend.as_ref(), &actions, &filters)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MappingDescriptor {
            unit: self.unit.to_string(),
            version,
            default_backend,
            endpoints,
            actions,
            filters,
            errors,
        })
    }

    fn endpoint(
        &self,
        index: usize,
        raw: RawEndpoint,
        default_backend: Option<&Backend>,
        actions: &HashMap<String, String>,
        filters: &HashMap<String, String>,
    ) -> Result<EndpointSpec, ConfigError> {
        let method_text = non_empty(raw.method)
            .ok_or_else(|| self.missing(format!("`method` on endpoint #{index}")))?;
        let method = Method::from_bytes(method_text.to_ascii_uppercase().as_bytes()).map_err(
            |_| ConfigError::InvalidMethod {
                unit: self.unit.to_string(),
                index,
                method: method_text.clone(),
            },
        )?;
        let external_path = verbatim(raw.external)
            .ok_or_else(|| self.missing(format!("`externalEndpoint` on endpoint #{index}")))?;
        let internal_path = verbatim(raw.internal).unwrap_or_else(|| external_path.clone());

        let variable = match (non_empty(raw.var_name), verbatim(raw.var_expression)) {
            (Some(name), Some(expression)) => Some(PathVariable { name, expression }),
            _ => None,
        };

        let action_names: Vec<String> = raw
            .action
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        for name in &action_names {
            if !actions.contains_key(name) {
                return Err(self.unknown(index, "action", name));
            }
        }

        let filter_name = non_empty(raw.filter);
        if let Some(name) = &filter_name {
            if !filters.contains_key(name) {
                return Err(self.unknown(index, "filter", name));
            }
        }

        let backend = match (raw.backend_host, raw.backend_port) {
            (None, None) => default_backend.cloned().ok_or_else(|| {
                self.missing(format!("<backend> (endpoint #{index} declares none)"))
            })?,
            (host, port) => self.backend(host, port)?,
        };

        Ok(EndpointSpec {
            method,
            external_path,
            internal_path,
            variable,
            action_names,
            filter_name,
            scope: non_empty(raw.scope),
            backend,
        })
    }

    fn backend(&self, host: Option<String>, port: Option<String>) -> Result<Backend, ConfigError> {
        let host = non_empty(host).ok_or_else(|| self.invalid_backend("host is missing"))?;
        let port = non_empty(port).ok_or_else(|| self.invalid_backend("port is missing"))?;
        let port: u16 = port
            .parse()
            .map_err(|_| self.invalid_backend(format!("port `{port}` is not a valid port")))?;
        Ok(Backend { host, port })
    }

    fn named_map(
        &self,
        kind: &'static str,
        items: Vec<RawNamed>,
    ) -> Result<HashMap<String, String>, ConfigError> {
        let mut map = HashMap::with_capacity(items.len());
        for item in items {
            let name = non_empty(item.name)
                .ok_or_else(|| self.missing(format!("`name` on {kind}")))?;
            let class = non_empty(item.class_name)
                .ok_or_else(|| self.missing(format!("`className` on {kind} `{name}`")))?;
            if map.insert(name.clone(), class).is_some() {
                self.duplicate(kind, name)?;
            }
        }
        Ok(map)
    }

    fn errors(&self, items: Vec<RawError>) -> Result<HashMap<u16, String>, ConfigError> {
        let mut map = HashMap::with_capacity(items.len());
        for item in items {
            let status_text =
                non_empty(item.status).ok_or_else(|| self.missing("`status` on error"))?;
            let status: u16 = status_text
                .parse()
                .ok()
                .filter(|s| (100..=599).contains(s))
                .ok_or_else(|| ConfigError::InvalidStatus {
                    unit: self.unit.to_string(),
                    status: status_text.clone(),
                })?;
            let message = item.message.unwrap_or_default();
            if map.insert(status, message).is_some() {
                self.duplicate("error", status.to_string())?;
            }
        }
        Ok(map)
    }

    fn duplicate(&self, kind: &'static str, name: String) -> Result<(), ConfigError> {
        if self.options.strict_duplicates {
            return Err(ConfigError::Duplicate {
                unit: self.unit.to_string(),
                kind,
                name,
            });
        }
        tracing::debug!(unit = %self.unit, kind, name = %name, "Repeated name, last declaration wins");
        Ok(())
    }

    fn missing(&self, what: impl Into<String>) -> ConfigError {
        ConfigError::Missing {
            unit: self.unit.to_string(),
            what: what.into(),
        }
    }

    fn invalid_backend(&self, detail: impl Into<String>) -> ConfigError {
        ConfigError::InvalidBackend {
            unit: self.unit.to_string(),
            detail: detail.into(),
        }
    }

    fn unknown(&self, index: usize, kind: &'static str, name: &str) -> ConfigError {
        ConfigError::UnknownReference {
            unit: self.unit.to_string(),
            index,
            kind,
            name: name.to_string(),
        }
    }
}

/// Identifier attributes: surrounding whitespace is insignificant.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Paths and expressions feed the pattern compiler exactly as written.
fn verbatim(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(content: &str) -> SourceUnit {
        SourceUnit {
            id: "test.xml".into(),
            content: content.into(),
        }
    }

    const ACCOUNTS: &str = r#"
        <mappings version="v1">
            <backend host="api.internal" port="8080"/>
            <endpoints>
                <endpoint method="GET" externalEndpoint="/accounts/{id}" internalEndpoint="/internal/accounts/{id}"
                          varName="id" varExpression="[0-9]+" action="logAction" filter="hideSecrets"/>
                <endpoint method="post" externalEndpoint="/accounts" backendHost="writer.internal" backendPort="9090"
                          action="logAction, audit"/>
            </endpoints>
            <actions>
                <action name="logAction" className="com.example.LogAction"/>
                <action name="audit" className="com.example.AuditAction"/>
            </actions>
            <filters>
                <filter name="hideSecrets" className="com.example.HideSecrets"/>
            </filters>
            <errors>
                <error status="404" message="No such account"/>
            </errors>
        </mappings>
    "#;

    #[test]
    fn test_parse_full_descriptor() {
        let d = parse(&unit(ACCOUNTS), ParseOptions::default()).unwrap();
        assert_eq!(d.version, "v1");
        assert_eq!(d.default_backend, Some(Backend::new("api.internal", 8080)));
        assert_eq!(d.endpoints.len(), 2);

        let get = &d.endpoints[0];
        assert_eq!(get.method, Method::GET);
        assert_eq!(get.internal_path, "/internal/accounts/{id}");
        assert_eq!(get.variable.as_ref().unwrap().expression, "[0-9]+");
        assert_eq!(get.action_names, vec!["logAction"]);
        assert_eq!(get.filter_name.as_deref(), Some("hideSecrets"));
        assert_eq!(get.backend, Backend::new("api.internal", 8080));

        let post = &d.endpoints[1];
        assert_eq!(post.method, Method::POST);
        assert_eq!(post.internal_path, "/accounts");
        assert_eq!(post.action_names, vec!["logAction", "audit"]);
        assert_eq!(post.backend, Backend::new("writer.internal", 9090));

        assert_eq!(d.actions["audit"], "com.example.AuditAction");
        assert_eq!(d.filters["hideSecrets"], "com.example.HideSecrets");
        assert_eq!(d.errors[&404], "No such account");
    }

    #[test]
    fn test_repeated_action_last_wins() {
        let xml = r#"
            <mappings version="v1">
                <backend host="h" port="1"/>
                <endpoints/>
                <actions>
                    <action name="a" className="First"/>
                    <action name="a" className="Second"/>
                </actions>
            </mappings>
        "#;
        let d = parse(&unit(xml), ParseOptions::default()).unwrap();
        assert_eq!(d.actions["a"], "Second");

        let strict = ParseOptions {
            strict_duplicates: true,
        };
        let err = parse(&unit(xml), strict).unwrap_err();
        assert!(matches!(err, ConfigError::Duplicate { kind: "action", .. }));
    }

    #[test]
    fn test_missing_sections() {
        let no_version = r#"<mappings><endpoints/></mappings>"#;
        assert!(matches!(
            parse(&unit(no_version), ParseOptions::default()),
            Err(ConfigError::Missing { .. })
        ));

        let no_endpoints = r#"<mappings version="v1"><backend host="h" port="1"/></mappings>"#;
        assert!(matches!(
            parse(&unit(no_endpoints), ParseOptions::default()),
            Err(ConfigError::Missing { .. })
        ));
    }

    #[test]
    fn test_malformed_backend() {
        let xml = r#"
            <mappings version="v1">
                <backend host="h" port="eighty"/>
                <endpoints/>
            </mappings>
        "#;
        assert!(matches!(
            parse(&unit(xml), ParseOptions::default()),
            Err(ConfigError::InvalidBackend { .. })
        ));
    }

    #[test]
    fn test_endpoint_without_any_backend() {
        let xml = r#"
            <mappings version="v1">
                <endpoints>
                    <endpoint method="GET" externalEndpoint="/ping"/>
                </endpoints>
            </mappings>
        "#;
        let err = parse(&unit(xml), ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[test]
    fn test_undeclared_action_reference() {
        let xml = r#"
            <mappings version="v1">
                <backend host="h" port="1"/>
                <endpoints>
                    <endpoint method="GET" externalEndpoint="/ping" action="ghost"/>
                </endpoints>
            </mappings>
        "#;
        let err = parse(&unit(xml), ParseOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownReference { index: 0, kind: "action", .. }
        ));
    }

    #[test]
    fn test_invalid_error_status() {
        let xml = r#"
            <mappings version="v1">
                <backend host="h" port="1"/>
                <endpoints/>
                <errors><error status="abc" message="x"/></errors>
            </mappings>
        "#;
        assert!(matches!(
            parse(&unit(xml), ParseOptions::default()),
            Err(ConfigError::InvalidStatus { .. })
        ));
    }

    #[test]
    fn test_not_xml() {
        let err = parse(
            &unit(r#"<mappings version="v1"><endpoints>"#),
            ParseOptions::default(),
        ).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn test_paths_and_expressions_kept_verbatim() {
        let xml = r#"
            <mappings version=" v1 ">
                <backend host="api.internal" port="8080"/>
                <endpoints>
                    <endpoint method=" get " externalEndpoint="/files/{name} " varName=" name "
                              varExpression="[a-z]+ " internalEndpoint=" /store/{name}"/>
                </endpoints>
            </mappings>
        "#;
        let d = parse(&unit(xml), ParseOptions::default()).unwrap();
        assert_eq!(d.version, "v1");

        let endpoint = &d.endpoints[0];
        assert_eq!(endpoint.method, Method::GET);
        assert_eq!(endpoint.external_path, "/files/{name} ");
        assert_eq!(endpoint.internal_path, " /store/{name}");
        let variable = endpoint.variable.as_ref().unwrap();
        assert_eq!(variable.name, "name");
        assert_eq!(variable.expression, "[a-z]+ ");
    }
}
