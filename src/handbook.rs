use anyhow::{Context, Result};

use handbook_core::knowledge::KnowledgeBase;

use crate::config::Config;

/// Load the corpus named by `[handbook].path`, or the built-in handbook.
pub fn load_handbook(config: &Config) -> Result<KnowledgeBase> {
    let kb = match &config.handbook.path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read handbook file: {}", path.display()))?;
            KnowledgeBase::from_toml_str(&content)
                .with_context(|| format!("Invalid handbook file: {}", path.display()))?
        }
        None => KnowledgeBase::builtin(),
    };

    tracing::info!(
        sections = kb.sections.len(),
        passages = kb.passage_count(),
        topics = kb.topics.len(),
        "handbook loaded"
    );
    Ok(kb)
}

/// CLI entry point for `handbook sections`.
pub fn run_sections(config: &Config) -> Result<()> {
    let kb = load_handbook(config)?;

    println!("{:<4} {:<8} SECTION", "#", "ITEMS");
    for (i, section) in kb.sections.iter().enumerate() {
        println!("{:<4} {:<8} {}", i + 1, section.passages.len(), section.name);
    }
    Ok(())
}

/// CLI entry point for `handbook section <name>`.
pub fn run_section(config: &Config, name: &str) -> Result<()> {
    let kb = load_handbook(config)?;

    let Some((section, passages)) = kb.section_content(name) else {
        eprintln!("Error: section not found: {}", name);
        eprintln!("Available sections:");
        for s in kb.section_names() {
            eprintln!("  {}", s);
        }
        std::process::exit(1);
    };

    println!("--- {} ({} items) ---", section, passages.len());
    for (i, passage) in passages.iter().enumerate() {
        println!("{}. {}", i + 1, passage);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_builtin_by_default() {
        let kb = load_handbook(&Config::minimal()).unwrap();
        assert_eq!(kb.sections.len(), 7);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("corpus.toml");
        std::fs::write(
            &path,
            "[[sections]]\nname = \"Housing\"\npassages = [\"Dorm rooms are assigned in order.\"]\n",
        )
        .unwrap();

        let mut config = Config::minimal();
        config.handbook.path = Some(path);
        let kb = load_handbook(&config).unwrap();
        assert_eq!(kb.section_names(), vec!["Housing"]);
        assert!(kb.topics.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let mut config = Config::minimal();
        config.handbook.path = Some("/nonexistent/corpus.toml".into());
        let err = load_handbook(&config).unwrap_err();
        assert!(err.to_string().contains("Failed to read handbook file"));
    }
}
