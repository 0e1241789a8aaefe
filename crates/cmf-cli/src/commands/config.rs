//! Configuration management commands.

use std::path::Path;

use cmf_core::Config;

use crate::ConfigAction;

pub fn handle(action: ConfigAction, config_path: Option<&Path>) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            // Shown even when invalid, so a missing primary URL is visible.
            let config = Config::load(config_path)?;
            println!("# Config directory: {}", Config::config_dir().display());
            print!("{}", config.to_toml()?);

            let validation = config.validate();
            for issue in validation.errors() {
                eprintln!("error: {}: {}", issue.field, issue.message);
            }
            for issue in validation.warnings() {
                eprintln!("warning: {}: {}", issue.field, issue.message);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_file_is_layered() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http]\npage_size = 7").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.http.page_size, 7);
        assert!(config.to_toml().unwrap().contains("page_size = 7"));
    }
}
