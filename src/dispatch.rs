//! Fan a request document out to the chart builders and collect the
//! artifacts they produce into a manifest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{Config, OutputFormat};
use crate::error::{ChartError, Result};
use crate::layout::{Layout, compute_layout};
use crate::layout_dump::write_layout_dump;
use crate::render::{render_svg, write_output_png, write_output_svg};
use crate::request::{ChartKind, ChartRequest};

/// Destination for finished chart layouts.
pub trait ArtifactSink {
    /// Persist one chart and return the file name recorded in the manifest.
    fn emit(&mut self, kind: ChartKind, layout: &Layout) -> anyhow::Result<String>;
}

/// Writes `<stem>.png` (plus an SVG copy) or `<stem>.svg` into a directory.
pub struct FileSink {
    out_dir: PathBuf,
    config: Config,
    dump_layout: bool,
}

impl FileSink {
    pub fn new(out_dir: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            out_dir: out_dir.into(),
            config,
            dump_layout: false,
        }
    }

    /// Also write `<stem>.layout.json` next to every artifact.
    pub fn with_layout_dump(mut self, enabled: bool) -> Self {
        self.dump_layout = enabled;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

impl ArtifactSink for FileSink {
    fn emit(&mut self, kind: ChartKind, layout: &Layout) -> anyhow::Result<String> {
        let stem = kind.file_stem();
        let svg = render_svg(layout, &self.config.theme, &self.config.layout);

        let primary = match self.config.render.format {
            OutputFormat::Png => {
                let name = format!("{stem}.png");
                write_output_png(
                    &svg,
                    &self.out_dir.join(&name),
                    &self.config.render,
                    &self.config.theme,
                )?;
                if self.config.render.vector_copy {
                    write_output_svg(&svg, Some(&self.out_dir.join(format!("{stem}.svg"))))?;
                }
                name
            }
            OutputFormat::Svg => {
                let name = format!("{stem}.svg");
                write_output_svg(&svg, Some(&self.out_dir.join(&name)))?;
                name
            }
        };

        if self.dump_layout {
            write_layout_dump(&self.out_dir.join(format!("{stem}.layout.json")), layout)?;
        }
        Ok(primary)
    }
}

/// Keeps layouts in memory; useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub artifacts: Vec<(ChartKind, Layout)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(&self, kind: ChartKind) -> Option<&Layout> {
        self.artifacts
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, layout)| layout)
    }
}

impl ArtifactSink for MemorySink {
    fn emit(&mut self, kind: ChartKind, layout: &Layout) -> anyhow::Result<String> {
        self.artifacts.push((kind, layout.clone()));
        Ok(format!("{}.svg", kind.file_stem()))
    }
}

/// Chart name to artifact file name, as printed for the calling service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Manifest(BTreeMap<String, String>);

impl Manifest {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, kind: ChartKind, file: String) {
        self.0.insert(kind.manifest_key().to_string(), file);
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse a request document and render every recognised chart section.
pub fn dispatch(input: &str, sink: &mut dyn ArtifactSink, config: &Config) -> Result<Manifest> {
    let document: Value = serde_json::from_str(input)?;
    dispatch_value(document, sink, config)
}

/// Like [`dispatch`] for an already parsed document.
pub fn dispatch_value(
    document: Value,
    sink: &mut dyn ArtifactSink,
    config: &Config,
) -> Result<Manifest> {
    let Value::Object(mut sections) = document else {
        return Err(ChartError::NotAMapping {
            found: json_type(&document),
        });
    };
    log_request_shape(&sections);

    let mut manifest = Manifest::default();
    for kind in ChartKind::ALL {
        let Some(section) = sections.remove(kind.key()) else {
            continue;
        };
        match render_chart(kind, section, sink, config) {
            Ok(file) => {
                tracing::info!(chart = kind.key(), file = file.as_str(), "chart written");
                manifest.insert(kind, file);
            }
            Err(err) => {
                let error = format!("{err:#}");
                tracing::warn!(chart = kind.key(), error = error.as_str(), "skipping chart");
            }
        }
    }
    for key in sections.keys() {
        tracing::debug!(key = key.as_str(), "ignoring unrecognised section");
    }
    Ok(manifest)
}

/// Resolve, lay out and emit a single chart section.
pub fn render_chart(
    kind: ChartKind,
    section: Value,
    sink: &mut dyn ArtifactSink,
    config: &Config,
) -> anyhow::Result<String> {
    let request = ChartRequest::from_value(kind, section)?;
    let layout = compute_layout(&request, &config.theme, &config.layout)?;
    sink.emit(kind, &layout)
}

fn log_request_shape(sections: &Map<String, Value>) {
    for kind in ChartKind::ALL {
        tracing::debug!(chart = kind.key(), present = sections.contains_key(kind.key()));
    }
    if let Some(count) = sections
        .get(ChartKind::Scree.key())
        .and_then(|scree| scree.get("scores"))
        .and_then(Value::as_array)
        .map(Vec::len)
    {
        tracing::debug!(count, "scree scores received");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::DiagramData;

    struct FailingSink {
        calls: usize,
    }

    impl ArtifactSink for FailingSink {
        fn emit(&mut self, kind: ChartKind, _layout: &Layout) -> anyhow::Result<String> {
            self.calls += 1;
            if kind == ChartKind::Scree {
                anyhow::bail!("disk full");
            }
            Ok(kind.file_stem().to_string())
        }
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut sink = MemorySink::new();
        let manifest = dispatch(
            r#"{"prisma": {"identified": 5, "included": 1}, "pie": {"slices": []}}"#,
            &mut sink,
            &Config::default(),
        )
        .unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("prisma"), Some("prisma_flow.svg"));
        assert_eq!(sink.artifacts.len(), 1);
    }

    #[test]
    fn malformed_top_level_emits_nothing() {
        let mut sink = MemorySink::new();
        let err = dispatch("{not json", &mut sink, &Config::default()).unwrap_err();
        assert!(matches!(err, ChartError::InputFormat(_)));
        assert!(err.is_fatal());

        let err = dispatch("[1, 2]", &mut sink, &Config::default()).unwrap_err();
        assert!(matches!(err, ChartError::NotAMapping { found: "an array" }));
        assert!(sink.artifacts.is_empty());
    }

    #[test]
    fn broken_chart_does_not_stop_siblings() {
        let mut sink = MemorySink::new();
        let manifest = dispatch(
            r#"{
                "prisma": {"identified": "many"},
                "scree": {"scores": [0.9, 0.5, 0.1]},
                "quality_assessment": {"questions": ["Q1"], "yes": [], "no": [], "partial": []},
                "bubble_chart": {"entries": [{"keyword": "llm", "count": 4}]}
            }"#,
            &mut sink,
            &Config::default(),
        )
        .unwrap();
        let keys: Vec<&str> = manifest.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["bubble_chart", "scree"]);
    }

    #[test]
    fn sink_failure_is_scoped_to_one_chart() {
        let mut sink = FailingSink { calls: 0 };
        let manifest = dispatch(
            r#"{"scree": {"scores": []}, "search_strategy": [{"name": "ACM", "hits": 3}]}"#,
            &mut sink,
            &Config::default(),
        )
        .unwrap();
        assert_eq!(sink.calls, 2);
        assert_eq!(manifest.get("scree"), None);
        assert_eq!(manifest.get("chart1"), Some("chart1_search"));
    }

    #[test]
    fn sections_are_emitted_in_fixed_order() {
        let mut sink = MemorySink::new();
        dispatch(
            r#"{
                "technical_synthesis": {"studies": []},
                "temporal_distribution": {"years": {"2020": 1}},
                "scree": {"scores": [0.3]}
            }"#,
            &mut sink,
            &Config::default(),
        )
        .unwrap();
        let order: Vec<ChartKind> = sink.artifacts.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            order,
            vec![
                ChartKind::Scree,
                ChartKind::TemporalDistribution,
                ChartKind::TechnicalSynthesis
            ]
        );
        assert!(matches!(
            sink.layout(ChartKind::Scree).unwrap().diagram,
            DiagramData::Placeholder(_)
        ));
    }

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "review-charts-{label}-{}",
            std::process::id()
        ));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const FILE_SINK_REQUEST: &str = r#"{
        "prisma": {"identified": 100, "duplicates": 20, "screened": 80, "excluded": 50,
                   "retrieved": 30, "assessed": 30, "included": 12},
        "scree": {"scores": [0.9, 0.85, 0.8, 0.3, 0.2, 0.1]}
    }"#;

    #[test]
    fn file_sink_writes_svg_only_when_svg_is_primary() {
        let dir = scratch_dir("svg");
        let mut config = Config::default();
        config.render.format = OutputFormat::Svg;
        let mut sink = FileSink::new(&dir, config.clone());
        let manifest = dispatch(FILE_SINK_REQUEST, &mut sink, &config).unwrap();

        assert_eq!(manifest.get("prisma"), Some("prisma_flow.svg"));
        assert_eq!(manifest.get("scree"), Some("scree_plot.svg"));
        let svg = std::fs::read_to_string(dir.join("prisma_flow.svg")).unwrap();
        assert!(svg.starts_with("<svg") && svg.ends_with("</svg>"));
        assert!(dir.join("scree_plot.svg").exists());
        assert!(!dir.join("prisma_flow.png").exists());
        assert!(!dir.join("prisma_flow.layout.json").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[cfg(feature = "png")]
    #[test]
    fn file_sink_writes_png_with_vector_copy_and_dump() {
        let dir = scratch_dir("png");
        let config = Config::default();
        let mut sink = FileSink::new(&dir, config.clone()).with_layout_dump(true);
        let manifest = dispatch(FILE_SINK_REQUEST, &mut sink, &config).unwrap();

        assert_eq!(
            serde_json::to_string(&manifest).unwrap(),
            r#"{"prisma":"prisma_flow.png","scree":"scree_plot.png"}"#
        );
        for stem in ["prisma_flow", "scree_plot"] {
            let png = std::fs::read(dir.join(format!("{stem}.png"))).unwrap();
            assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
            assert!(dir.join(format!("{stem}.svg")).exists());
            let dump: Value = serde_json::from_str(
                &std::fs::read_to_string(dir.join(format!("{stem}.layout.json"))).unwrap(),
            )
            .unwrap();
            assert!(dump["width"].as_f64().unwrap() > 0.0);
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[cfg(feature = "png")]
    #[test]
    fn file_sink_skips_vector_copy_when_disabled() {
        let dir = scratch_dir("png-only");
        let mut config = Config::default();
        config.render.vector_copy = false;
        let mut sink = FileSink::new(&dir, config.clone());
        let manifest = dispatch(r#"{"scree": {"scores": []}}"#, &mut sink, &config).unwrap();

        assert_eq!(manifest.get("scree"), Some("scree_plot.png"));
        assert!(dir.join("scree_plot.png").exists());
        assert!(!dir.join("scree_plot.svg").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn manifest_serializes_as_flat_object() {
        let mut sink = MemorySink::new();
        let manifest = dispatch(
            r#"{"search_strategy": null}"#,
            &mut sink,
            &Config::default(),
        )
        .unwrap();
        let json = serde_json::to_string(&manifest).unwrap();
        assert_eq!(json, r#"{"chart1":"chart1_search.svg"}"#);
    }
}
