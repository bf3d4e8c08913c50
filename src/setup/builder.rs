//! Pure translation of a setup request into a [`RuntimeConfig`].

use crate::error::{AppError, AppResult};
use crate::setup::runtime::{
    DashboardSettings, MinecraftSettings, RuntimeConfig, ServiceSettings, DEFAULT_LOG_DIRECTORY,
};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

pub const DEFAULT_FLAVOUR: &str = "vanilla";
pub const DEFAULT_VERSION: &str = "latest";

/// Body of `POST /setup`.
///
/// Numeric fields arrive as text from the setup form; JSON numbers are
/// accepted too and treated the same way.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetupRequest {
    #[serde(default, deserialize_with = "text_or_number")]
    pub mc_port: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub memory: Option<String>,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub flavour: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub nmc_port: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TextOrNumber>::deserialize(deserializer)?.map(|v| match v {
        TextOrNumber::Text(s) => s,
        TextOrNumber::Number(n) => n.to_string(),
    }))
}

/// Build the post-setup configuration.
///
/// The service API key is carried over from `current`; everything else comes
/// from the request or the static defaults. `jarfile` stays unset until the
/// artifact has been provisioned.
pub fn build_config(request: &SetupRequest, current: &RuntimeConfig) -> AppResult<RuntimeConfig> {
    let mc_port: u16 = parse_port("mc_port", request.mc_port.as_deref())?;
    let memory: u32 = parse_number("memory", request.memory.as_deref())?;
    if memory == 0 {
        return Err(AppError::validation("memory must be greater than zero"));
    }
    let nmc_port: u16 = parse_port("nmc_port", request.nmc_port.as_deref())?;

    let directory = request
        .directory
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::validation("directory is required"))?;

    Ok(RuntimeConfig {
        firstrun: false,
        minecraft: MinecraftSettings {
            name: current.minecraft.name.clone(),
            port: mc_port,
            ram: format!("{}M", memory),
            dir: with_trailing_separator(directory),
            jar: or_default(request.flavour.as_deref(), DEFAULT_FLAVOUR),
            version: or_default(request.version.as_deref(), DEFAULT_VERSION),
            jarfile: None,
        },
        nodemc: ServiceSettings {
            apikey: current.nodemc.apikey.clone(),
            port: nmc_port,
            log_directory: DEFAULT_LOG_DIRECTORY.to_string(),
        },
        dashboard: DashboardSettings::default(),
    })
}

/// Strict base-10 parse: surrounding whitespace is ignored, anything else
/// that is not a digit is an error.
fn parse_number<T: FromStr>(field: &str, value: Option<&str>) -> AppResult<T> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(format!("{} is required", field)))?;

    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::validation(format!(
            "{} must be a base-10 integer, got {:?}",
            field, raw
        )));
    }

    raw.parse()
        .map_err(|_| AppError::validation(format!("{} is out of range: {}", field, raw)))
}

fn parse_port(field: &str, value: Option<&str>) -> AppResult<u16> {
    match parse_number::<u16>(field, value)? {
        0 => Err(AppError::validation(format!("{} must not be 0", field))),
        port => Ok(port),
    }
}

fn or_default(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

fn with_trailing_separator(dir: &str) -> String {
    if dir.ends_with('/') {
        dir.to_string()
    } else {
        format!("{}/", dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::keys::new_api_key;
    use proptest::prelude::*;

    fn request(mc_port: &str, memory: &str, directory: &str, nmc_port: &str) -> SetupRequest {
        SetupRequest {
            mc_port: Some(mc_port.to_string()),
            memory: Some(memory.to_string()),
            directory: Some(directory.to_string()),
            flavour: None,
            version: None,
            nmc_port: Some(nmc_port.to_string()),
        }
    }

    #[test]
    fn test_build_from_form_fields() {
        let current = RuntimeConfig::template(new_api_key());
        let config = build_config(&request("25565", "1024", "/srv/mc", "3000"), &current).unwrap();

        assert_eq!(config.minecraft.port, 25565);
        assert_eq!(config.minecraft.ram, "1024M");
        assert_eq!(config.minecraft.dir, "/srv/mc/");
        assert_eq!(config.minecraft.jar, "vanilla");
        assert_eq!(config.minecraft.version, "latest");
        assert!(config.minecraft.jarfile.is_none());
        assert_eq!(config.nodemc.port, 3000);
        assert_eq!(config.nodemc.apikey, current.nodemc.apikey);
        assert_eq!(config.nodemc.log_directory, "./nodemc/logs");
        assert_eq!(config.dashboard, DashboardSettings::default());
        assert!(!config.firstrun);
    }

    #[test]
    fn test_explicit_flavour_and_version() {
        let current = RuntimeConfig::template(new_api_key());
        let mut req = request("25565", "2048", "/srv/mc/", "3000");
        req.flavour = Some("paper".to_string());
        req.version = Some("1.20.4".to_string());

        let config = build_config(&req, &current).unwrap();
        assert_eq!(config.minecraft.jar, "paper");
        assert_eq!(config.minecraft.version, "1.20.4");
        assert_eq!(config.minecraft.dir, "/srv/mc/");
    }

    #[test]
    fn test_empty_flavour_falls_back() {
        let current = RuntimeConfig::template(new_api_key());
        let mut req = request("25565", "1024", "/srv/mc", "3000");
        req.flavour = Some(String::new());
        let config = build_config(&req, &current).unwrap();
        assert_eq!(config.minecraft.jar, "vanilla");
    }

    #[test]
    fn test_malformed_numbers_rejected() {
        let current = RuntimeConfig::template(new_api_key());
        for (port, memory, nmc) in [
            ("abc", "1024", "3000"),
            ("25565", "lots", "3000"),
            ("25565", "1024", "3000x"),
            ("-1", "1024", "3000"),
            ("70000", "1024", "3000"),
            ("0", "1024", "3000"),
            ("25565", "0", "3000"),
            ("", "1024", "3000"),
        ] {
            let result = build_config(&request(port, memory, "/srv/mc", nmc), &current);
            assert!(
                matches!(result, Err(AppError::Validation(_))),
                "expected validation error for {:?}",
                (port, memory, nmc)
            );
        }
    }

    #[test]
    fn test_missing_directory_rejected() {
        let current = RuntimeConfig::template(new_api_key());
        let result = build_config(&request("25565", "1024", "  ", "3000"), &current);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_json_numbers_accepted() {
        let req: SetupRequest = serde_json::from_value(serde_json::json!({
            "mc_port": 25565,
            "memory": "512",
            "directory": "/srv/mc",
            "nmc_port": 3001
        }))
        .unwrap();
        assert_eq!(req.mc_port.as_deref(), Some("25565"));
        assert_eq!(req.nmc_port.as_deref(), Some("3001"));
        assert!(req.flavour.is_none());
    }

    proptest! {
        #[test]
        fn test_valid_numbers_round_trip(port in 1u16.., memory in 1u32..) {
            let current = RuntimeConfig::template(new_api_key());
            let req = request(&port.to_string(), &memory.to_string(), "/data", &port.to_string());
            let config = build_config(&req, &current).unwrap();
            prop_assert_eq!(config.minecraft.port, port);
            prop_assert_eq!(config.minecraft.ram, format!("{}M", memory));
        }

        #[test]
        fn test_non_digit_port_rejected(port in "[0-9]{0,3}[a-zA-Z+.,_-][0-9]{0,3}") {
            let current = RuntimeConfig::template(new_api_key());
            let req = request(&port, "1024", "/data", "3000");
            prop_assert!(matches!(build_config(&req, &current), Err(AppError::Validation(_))));
        }
    }
}
