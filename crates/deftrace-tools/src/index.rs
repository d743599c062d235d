//! `deftrace index`: run both passes and write JSON-lines records.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::{debug, info};

use deftrace_clojure::{ClojureFrontEnd, ClojureUnit};
use deftrace_core::{FrontEnd, IndexStats, Indexer, IndexerConfig, JsonLinesSink};
use deftrace_cpp::{CppFrontEnd, CppUnit};

/// Input language.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lang {
    /// Clojure source files
    Clojure,
    /// JSON arrays of C-family tree events
    Cpp,
}

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Input language
    #[arg(long, value_enum)]
    pub lang: Lang,

    /// JSON configuration file; flags below override its fields
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Label stamped into every def-key
    #[arg(long)]
    pub unit: Option<String>,

    /// Namespace in effect before a unit declares one
    #[arg(long)]
    pub namespace: Option<String>,

    /// Resolve references of separate units in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Input files, indexed in the order given
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

impl IndexArgs {
    /// The configuration file (or defaults) with flag overrides applied.
    pub fn resolve_config(&self) -> Result<IndexerConfig> {
        let mut config = match &self.config {
            Some(path) => IndexerConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => IndexerConfig::default(),
        };
        if let Some(unit) = &self.unit {
            config.unit = Some(unit.clone());
        }
        if let Some(namespace) = &self.namespace {
            config.default_namespace = namespace.clone();
        }
        config.parallel |= self.parallel;
        config.validate()?;
        Ok(config)
    }
}

/// Run `deftrace index`.
pub fn run(args: IndexArgs) -> Result<IndexStats> {
    let config = args.resolve_config()?;
    debug!(?config, "resolved configuration");

    let stats = match &args.out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating output {}", path.display()))?;
            index_to(&args, config, BufWriter::new(file))?
        }
        None => index_to(&args, config, io::stdout().lock())?,
    };

    info!(
        units = stats.units,
        defs = stats.defs,
        refs = stats.refs,
        "wrote {} records",
        stats.defs + stats.refs
    );
    Ok(stats)
}

fn index_to<W: Write>(args: &IndexArgs, config: IndexerConfig, writer: W) -> Result<IndexStats> {
    let indexer = Indexer::new(config);
    match args.lang {
        Lang::Clojure => {
            let frontend = ClojureFrontEnd::from_config(indexer.config());
            let units = load(&args.inputs, ClojureUnit::from_file)?;
            write_records(&indexer, &frontend, &units, writer)
        }
        Lang::Cpp => {
            let frontend = CppFrontEnd::from_config(indexer.config());
            let units = load(&args.inputs, CppUnit::from_json_file)?;
            write_records(&indexer, &frontend, &units, writer)
        }
    }
}

fn load<U>(
    inputs: &[PathBuf],
    read: impl Fn(&Path) -> deftrace_core::Result<U>,
) -> Result<Vec<U>> {
    inputs
        .iter()
        .map(|path| read(path).with_context(|| format!("reading {}", path.display())))
        .collect()
}

fn write_records<F: FrontEnd, W: Write>(
    indexer: &Indexer,
    frontend: &F,
    units: &[F::Unit],
    writer: W,
) -> Result<IndexStats> {
    let mut sink = JsonLinesSink::new(writer);
    let stats = indexer.run(frontend, units, &mut sink)?;
    let mut writer = sink.finish()?;
    writer.flush().context("flushing output")?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(lang: Lang, inputs: Vec<PathBuf>, out: PathBuf) -> IndexArgs {
        IndexArgs {
            lang,
            config: None,
            unit: None,
            namespace: None,
            parallel: false,
            out: Some(out),
            inputs,
        }
    }

    fn records(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_index_clojure_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("core.clj");
        fs::write(&src, "(ns demo) (defn f [x] x)").unwrap();
        let out = dir.path().join("out.jsonl");

        let stats = run(args(Lang::Clojure, vec![src], out.clone())).unwrap();
        assert_eq!(stats, IndexStats { units: 1, defs: 3, refs: 1 });

        let lines = records(&out);
        assert_eq!(lines.len(), 4);
        assert!(lines[..3].iter().all(|r| r.get("Def").is_some()));
        assert!(lines[3].get("Ref").is_some());
    }

    #[test]
    fn test_index_cpp_events() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.json");
        fs::write(
            &src,
            r#"[{"event": "declaration", "ty": {"type": "builtin", "text": "int"},
                 "declarators": [{"node": 1, "text": "x"}]},
                {"event": "primary_exit", "primary": {"ident": {"node": 2, "text": "x"}}},
                {"event": "expression_end"}]"#,
        )
        .unwrap();
        let out = dir.path().join("out.jsonl");

        let stats = run(args(Lang::Cpp, vec![src], out.clone())).unwrap();
        assert_eq!(stats, IndexStats { units: 1, defs: 1, refs: 1 });
        assert_eq!(records(&out).len(), 2);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        fs::write(&config, r#"{"unit": "from-file", "default_namespace": "cfg"}"#).unwrap();

        let mut args = args(Lang::Clojure, vec![], dir.path().join("out"));
        args.config = Some(config);
        args.unit = Some("from-flag".to_string());
        args.parallel = true;

        let resolved = args.resolve_config().unwrap();
        assert_eq!(resolved.unit.as_deref(), Some("from-flag"));
        assert_eq!(resolved.default_namespace, "cfg");
        assert!(resolved.parallel);
    }

    #[test]
    fn test_missing_input_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.clj");
        let err = run(args(Lang::Clojure, vec![missing], dir.path().join("out"))).unwrap_err();
        assert!(format!("{err:#}").contains("nope.clj"));
    }
}
