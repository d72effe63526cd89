use std::path::Path;

use secrecy::ExposeSecret;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// resolved, the TOML is malformed, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`] minus the file access
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending field
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_server_config()?;
        self.validate_llm_config()?;
        self.validate_optimisation_config()?;
        self.validate_auth_config()?;
        Ok(())
    }

    fn validate_server_config(&self) -> anyhow::Result<()> {
        let prefix = &self.server.route_prefix;

        if !prefix.starts_with('/') || (prefix.len() > 1 && prefix.ends_with('/')) {
            anyhow::bail!("server.route_prefix must start with '/' and must not end with '/': `{prefix}`");
        }

        if self.server.health.enabled && !self.server.health.path.starts_with('/') {
            anyhow::bail!("server.health.path must start with '/'");
        }

        Ok(())
    }

    fn validate_llm_config(&self) -> anyhow::Result<()> {
        if self.llm.default_model.trim().is_empty() {
            anyhow::bail!("llm.default_model must not be empty");
        }

        if self.llm.fallback_model.trim().is_empty() {
            anyhow::bail!("llm.fallback_model must not be empty");
        }

        if self.llm.foreign_prefixes.iter().any(|p| p.is_empty()) {
            anyhow::bail!("llm.foreign_prefixes must not contain an empty prefix");
        }

        if self.llm.bedrock.catalog_refresh_seconds == 0 {
            anyhow::bail!("llm.bedrock.catalog_refresh_seconds must be greater than 0");
        }

        // Static credentials come as a pair or not at all
        if self.llm.bedrock.access_key_id.is_some() != self.llm.bedrock.secret_access_key.is_some() {
            anyhow::bail!("llm.bedrock.access_key_id and llm.bedrock.secret_access_key must be set together");
        }

        Ok(())
    }

    fn validate_optimisation_config(&self) -> anyhow::Result<()> {
        let name = &self.optimisation.default_strategy;

        // The name is matched against the first `-` segment of a model id
        if name.is_empty() || name.contains('-') || name.chars().any(char::is_whitespace) {
            anyhow::bail!("optimisation.default_strategy must be a single segment without '-' or spaces: `{name}`");
        }

        Ok(())
    }

    fn validate_auth_config(&self) -> anyhow::Result<()> {
        if self.auth.api_key.expose_secret().is_empty() {
            anyhow::bail!("auth.api_key must not be empty");
        }

        if self.auth.api_key_parameter.as_deref().is_some_and(|name| name.trim().is_empty()) {
            anyhow::bail!("auth.api_key_parameter must not be empty when set");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use crate::Config;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml("").unwrap();

        assert_eq!(config.server.route_prefix, "/api/v1");
        assert!(config.server.health.enabled);
        assert_eq!(config.auth.api_key.expose_secret(), "bedrock");
        assert_eq!(config.llm.default_model, "anthropic.claude-3-5-sonnet-20241022-v2:0");
        assert_eq!(config.llm.fallback_model, "anthropic.claude-3-sonnet-20240229-v1:0");
        assert_eq!(config.llm.foreign_prefixes, vec!["gpt-".to_owned()]);
        assert_eq!(config.llm.bedrock.region, "us-west-2");
        assert_eq!(config.llm.bedrock.catalog_refresh_seconds, 300);
        assert!(!config.optimisation.enabled);
        assert_eq!(config.optimisation.default_strategy, "direct");
        assert!(config.telemetry.is_none());
    }

    #[test]
    fn loads_file_with_env_placeholders() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [llm]
            default_model = "{{{{ env.KEEL_TEST_DEFAULT_MODEL }}}}"

            [optimisation]
            enabled = {{{{ env.KEEL_TEST_OPTIMISE | default("false") }}}}
            "#
        )
        .unwrap();

        let vars = [
            ("KEEL_TEST_DEFAULT_MODEL", Some("anthropic.claude-3-haiku-20240307-v1:0")),
            ("KEEL_TEST_OPTIMISE", Some("true")),
        ];

        temp_env::with_vars(vars, || {
            let config = Config::load(file.path()).unwrap();
            assert_eq!(config.llm.default_model, "anthropic.claude-3-haiku-20240307-v1:0");
            assert!(config.optimisation.enabled);
        });
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = Config::load(std::path::Path::new("/nonexistent/keel.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/keel.toml"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::from_toml("[llm]\nproviders = []\n").unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn empty_fallback_model_is_rejected() {
        let err = Config::from_toml("[llm]\nfallback_model = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("llm.fallback_model"));
    }

    #[test]
    fn zero_refresh_interval_is_rejected() {
        let err = Config::from_toml("[llm.bedrock]\ncatalog_refresh_seconds = 0\n").unwrap_err();
        assert!(err.to_string().contains("catalog_refresh_seconds"));
    }

    #[test]
    fn half_configured_credentials_are_rejected() {
        let err = Config::from_toml("[llm.bedrock]\naccess_key_id = \"AKIA\"\n").unwrap_err();
        assert!(err.to_string().contains("must be set together"));
    }

    #[test]
    fn hyphenated_strategy_name_is_rejected() {
        let err = Config::from_toml("[optimisation]\ndefault_strategy = \"best-of-n\"\n").unwrap_err();
        assert!(err.to_string().contains("optimisation.default_strategy"));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = Config::from_toml("[auth]\napi_key = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("auth.api_key"));
    }

    #[test]
    fn api_key_parameter_from_env() {
        let raw = r#"
            [auth]
            api_key_parameter = "{{ env.KEEL_TEST_KEY_PARAM }}"
            "#;

        temp_env::with_var("KEEL_TEST_KEY_PARAM", Some("/keel/prod/api-key"), || {
            let config = Config::from_toml(raw).unwrap();
            assert_eq!(config.auth.api_key_parameter.as_deref(), Some("/keel/prod/api-key"));
        });

        assert!(Config::from_toml("").unwrap().auth.api_key_parameter.is_none());
    }

    #[test]
    fn blank_api_key_parameter_is_rejected() {
        let err = Config::from_toml("[auth]\napi_key_parameter = \" \"\n").unwrap_err();
        assert!(err.to_string().contains("auth.api_key_parameter"));
    }

    #[test]
    fn trailing_slash_prefix_is_rejected() {
        let err = Config::from_toml("[server]\nroute_prefix = \"/api/v1/\"\n").unwrap_err();
        assert!(err.to_string().contains("route_prefix"));
    }

    #[test]
    fn telemetry_section_parses_exporter() {
        let config = Config::from_toml(
            r#"
            [telemetry]
            service_name = "keel-test"

            [telemetry.exporter]
            endpoint = "http://localhost:4317"
            protocol = "http_proto"
            "#,
        )
        .unwrap();

        let telemetry = config.telemetry.unwrap();
        assert_eq!(telemetry.service_name, "keel-test");
        assert!(telemetry.has_exporter());
    }
}
