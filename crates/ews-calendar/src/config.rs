//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. ews-gateway.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use crate::error::{CalendarError, Result};
use crate::models::BaseShape;
use crate::soap::DEFAULT_SERVER_VERSION;
use crate::xml::WriteOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "ews-gateway.toml";

/// Request building settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Detail level for GetItem when none is given
    #[serde(default)]
    pub base_shape: BaseShape,

    /// Resend updated invitations only to attendees whose entries changed
    #[serde(default)]
    pub send_only_to_changed_attendees: bool,

    /// Reject unknown changed-field names instead of skipping them
    #[serde(default = "default_strict_fields")]
    pub strict_fields: bool,

    /// Value of `RequestServerVersion` in the SOAP header
    #[serde(default = "default_server_version")]
    pub server_version: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            base_shape: BaseShape::default(),
            send_only_to_changed_attendees: false,
            strict_fields: default_strict_fields(),
            server_version: default_server_version(),
        }
    }
}

/// Document output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Indent nested elements
    #[serde(default)]
    pub pretty: bool,

    /// Wrap the operation in a SOAP envelope
    #[serde(default)]
    pub envelope: bool,

    /// Emit an XML declaration
    #[serde(default = "default_xml_declaration")]
    pub xml_declaration: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: false,
            envelope: false,
            xml_declaration: default_xml_declaration(),
        }
    }
}

impl OutputConfig {
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            pretty: self.pretty,
            xml_declaration: self.xml_declaration,
        }
    }
}

fn default_strict_fields() -> bool {
    true
}

fn default_server_version() -> String {
    DEFAULT_SERVER_VERSION.to_string()
}

fn default_xml_declaration() -> bool {
    true
}

/// Main configuration for ews-gateway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub request: RequestConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 文字列を解析する (環境変数による上書きなし)
    pub fn parse_toml(content: &str) -> Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let toml: TomlConfig = toml::from_str(&expanded)
            .map_err(|e| CalendarError::Configuration(format!("Failed to parse TOML: {}", e)))?;
        Self::from_toml_config(toml)
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// # 引数
    /// * `path` - TOML ファイルのパス
    ///
    /// 環境変数が設定されていればファイルの値より優先されます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            CalendarError::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut cfg = Self::parse_toml(&content)?;
        cfg.apply_env_overrides();

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(cfg)
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// `./ews-gateway.toml` があればそれを使い、なければ環境変数のみ。
    pub fn load() -> Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Ok(Self::from_env())
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    fn from_toml_config(toml: TomlConfig) -> Result<Self> {
        let request = toml.request.unwrap_or_default();
        let base_shape = match request.base_shape {
            Some(shape) => shape.parse()?,
            None => BaseShape::default(),
        };

        let output = toml.output.unwrap_or_default();

        Ok(Config {
            request: RequestConfig {
                base_shape,
                send_only_to_changed_attendees: request.send_only_to_changed_attendees.unwrap_or(false),
                strict_fields: request.strict_fields.unwrap_or_else(default_strict_fields),
                server_version: request
                    .server_version
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(default_server_version),
            },
            output: OutputConfig {
                pretty: output.pretty.unwrap_or(false),
                envelope: output.envelope.unwrap_or(false),
                xml_declaration: output.xml_declaration.unwrap_or_else(default_xml_declaration),
            },
        })
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        if let Ok(shape) = std::env::var("EWS_BASE_SHAPE") {
            match shape.parse() {
                Ok(shape) => self.request.base_shape = shape,
                Err(e) => tracing::warn!("Ignoring EWS_BASE_SHAPE: {}", e),
            }
        }
        if let Some(flag) = env_flag("EWS_SEND_ONLY_TO_CHANGED") {
            self.request.send_only_to_changed_attendees = flag;
        }
        if let Some(flag) = env_flag("EWS_STRICT_FIELDS") {
            self.request.strict_fields = flag;
        }
        if let Ok(version) = std::env::var("EWS_SERVER_VERSION") {
            if !version.is_empty() {
                self.request.server_version = version;
            }
        }

        if let Some(flag) = env_flag("EWS_PRETTY") {
            self.output.pretty = flag;
        }
        if let Some(flag) = env_flag("EWS_ENVELOPE") {
            self.output.envelope = flag;
        }
        if let Some(flag) = env_flag("EWS_XML_DECLARATION") {
            self.output.xml_declaration = flag;
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    let flag = parse_flag(&value);
    if flag.is_none() {
        tracing::warn!("Ignoring {}: expected true or false, got {:?}", name, value);
    }
    flag
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ============================================================================
// TOML 構造体定義（ファイル解析用）
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    /// リクエスト設定
    request: Option<TomlRequestConfig>,
    /// 出力設定
    output: Option<TomlOutputConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlRequestConfig {
    #[serde(default)]
    base_shape: Option<String>,
    #[serde(default)]
    send_only_to_changed_attendees: Option<bool>,
    #[serde(default)]
    strict_fields: Option<bool>,
    #[serde(default)]
    server_version: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlOutputConfig {
    #[serde(default)]
    pretty: Option<bool>,
    #[serde(default)]
    envelope: Option<bool>,
    #[serde(default)]
    xml_declaration: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_request_config_default() {
        let config = RequestConfig::default();
        assert_eq!(config.base_shape, BaseShape::Default);
        assert!(!config.send_only_to_changed_attendees);
        assert!(config.strict_fields);
        assert_eq!(config.server_version, "Exchange2010");
    }

    #[test]
    fn test_output_config_default() {
        let config = OutputConfig::default();
        assert!(!config.pretty);
        assert!(!config.envelope);
        assert!(config.xml_declaration);
        assert_eq!(
            config.write_options(),
            WriteOptions {
                pretty: false,
                xml_declaration: true
            }
        );
    }

    #[test]
    fn test_parse_toml() {
        let config = Config::parse_toml(
            r#"
            [request]
            base_shape = "AllProperties"
            strict_fields = false
            server_version = "Exchange2010_SP1"

            [output]
            pretty = true
            envelope = true
            "#,
        )
        .unwrap();

        assert_eq!(config.request.base_shape, BaseShape::AllProperties);
        assert!(!config.request.strict_fields);
        assert!(!config.request.send_only_to_changed_attendees);
        assert_eq!(config.request.server_version, "Exchange2010_SP1");
        assert!(config.output.pretty);
        assert!(config.output.envelope);
        assert!(config.output.xml_declaration);
    }

    #[test]
    fn test_parse_toml_empty_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_toml_rejects_bad_shape() {
        let err = Config::parse_toml("[request]\nbase_shape = \"Everything\"").unwrap_err();
        assert!(matches!(err, CalendarError::InvalidBaseShape(_)));
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[output]\nxml_declaration = false").unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert!(!config.output.xml_declaration);
    }

    #[test]
    fn test_from_toml_file_missing() {
        let err = Config::from_toml_file("/nonexistent/ews-gateway.toml").unwrap_err();
        assert!(matches!(err, CalendarError::Configuration(_)));
    }

    #[test]
    fn test_expand_env_vars() {
        // テスト用環境変数を設定
        unsafe {
            std::env::set_var("EWS_GATEWAY_TEST_VERSION", "Exchange2013");
        }

        let result = Config::expand_env_vars("server_version = \"${EWS_GATEWAY_TEST_VERSION}\"");
        assert_eq!(result, "server_version = \"Exchange2013\"");

        // 存在しない環境変数
        let result = Config::expand_env_vars("prefix_${EWS_GATEWAY_NONEXISTENT}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("EWS_GATEWAY_TEST_VERSION");
        }
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        assert_eq!(Config::expand_env_vars("cost $5"), "cost $5");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
