//! Tests for config module

#[cfg(test)]
mod tests {
    use crate::config::*;
    use serial_test::serial;
    use std::io::Write;

    // ========================================================================
    // Defaults
    // ========================================================================

    #[test]
    fn test_config_default_values() {
        // Arrange & Act
        let config = SpanseqConfig::default();

        // Assert
        assert_eq!(config.optimizer.nfa_threshold, 900);
        assert_eq!(config.optimizer.term_freq_divider, 500);
        assert_eq!(config.optimizer.min_unique_terms, 10_000);
        assert!(config.optimizer.nfa_matching_enabled);
        assert!(config.optimizer.require_many_unique_terms);
        assert_eq!(config.optimizer.max_rewrite_passes, 100);
        assert_eq!(config.search.timeout_ms, 30_000);
        assert!(config.search.parallel_shards);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(SpanseqConfig::default().validate().is_ok());
    }

    #[test]
    fn test_optimizer_config_builders() {
        // Arrange & Act
        let config = OptimizerConfig::default()
            .without_nfa()
            .with_nfa_threshold(250)
            .with_unique_terms_gate(false);

        // Assert
        assert!(!config.nfa_matching_enabled);
        assert_eq!(config.nfa_threshold, 250);
        assert!(!config.require_many_unique_terms);
    }

    // ========================================================================
    // TOML parsing
    // ========================================================================

    #[test]
    fn test_from_toml_partial_overrides() {
        // Arrange
        let toml_str = r#"
            [optimizer]
            nfa_threshold = 450
            require_many_unique_terms = false

            [search]
            max_hits = 10
        "#;

        // Act
        let config = SpanseqConfig::from_toml(toml_str).expect("parse");

        // Assert
        assert_eq!(config.optimizer.nfa_threshold, 450);
        assert!(!config.optimizer.require_many_unique_terms);
        assert_eq!(config.optimizer.term_freq_divider, 500);
        assert_eq!(config.search.max_hits, 10);
        assert_eq!(config.search.timeout_ms, 30_000);
    }

    #[test]
    fn test_from_toml_invalid_type_is_parse_error() {
        // Arrange
        let toml_str = r#"
            [optimizer]
            nfa_threshold = "high"
        "#;

        // Act
        let result = SpanseqConfig::from_toml(toml_str);

        // Assert
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_to_toml_roundtrip_keeps_values() {
        // Arrange
        let mut config = SpanseqConfig::default();
        config.optimizer.min_unique_terms = 42;
        config.logging.level = "debug".to_string();

        // Act
        let toml_str = config.to_toml().expect("serialize");
        let parsed = SpanseqConfig::from_toml(&toml_str).expect("parse");

        // Assert
        assert_eq!(parsed.optimizer, config.optimizer);
        assert_eq!(parsed.logging.level, "debug");
    }

    // ========================================================================
    // Validation
    // ========================================================================

    #[test]
    fn test_validate_rejects_zero_divider() {
        // Arrange
        let mut config = SpanseqConfig::default();
        config.optimizer.term_freq_divider = 0;

        // Act
        let result = config.validate();

        // Assert
        match result {
            Err(ConfigError::InvalidValue { key, .. }) => {
                assert_eq!(key, "optimizer.term_freq_divider");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_zero_rewrite_passes() {
        let mut config = SpanseqConfig::default();
        config.optimizer.max_rewrite_passes = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_log_level() {
        let mut config = SpanseqConfig::default();
        config.logging.level = "verbose".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = SpanseqConfig::default();
        config.logging.format = "xml".to_string();

        assert!(config.validate().is_err());
    }

    // ========================================================================
    // File and environment layering
    // ========================================================================

    #[test]
    #[serial]
    fn test_load_from_missing_file_uses_defaults() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.toml");

        // Act
        let config = SpanseqConfig::load_from_path(&path).expect("load");

        // Assert
        assert_eq!(config.optimizer, OptimizerConfig::default());
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("spanseq.toml");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "[optimizer]\nnfa_threshold = 300\nmin_unique_terms = 7").expect("write");
        std::env::set_var("SPANSEQ_OPTIMIZER__NFA_THRESHOLD", "600");

        // Act
        let config = SpanseqConfig::load_from_path(&path);
        std::env::remove_var("SPANSEQ_OPTIMIZER__NFA_THRESHOLD");
        let config = config.expect("load");

        // Assert
        assert_eq!(config.optimizer.nfa_threshold, 600);
        assert_eq!(config.optimizer.min_unique_terms, 7);
    }

    // ========================================================================
    // Process-wide default
    // ========================================================================

    #[test]
    #[serial]
    fn test_global_optimizer_config_swap() {
        // Arrange
        let original = global_optimizer_config();
        let replacement = OptimizerConfig::default().with_nfa_threshold(123);

        // Act
        set_global_optimizer_config(replacement.clone());
        let seen = global_optimizer_config();
        set_global_optimizer_config((*original).clone());

        // Assert
        assert_eq!(*seen, replacement);
        assert_eq!(*original, OptimizerConfig::default());
    }
}
