//! PRISMA 2020 flow diagram layout.
//!
//! Stages are stacked top to bottom with a running cursor. Every stage
//! reserves a vertical extent tall enough for both its main box and its side
//! box, centres both inside it, and then moves the cursor down by the extent
//! plus the stage gap. Box heights come from the number of text lines, so any
//! number of databases or exclusion reasons fits without overlap.

use crate::config::{BoxSizing, PrismaConfig};
use crate::request::{ReasonCounts, StageCounts};

use super::{
    Align, ArrowSpec, BandLabel, BoxGeometry, BoxRole, ConnectorSpec, FlowLayout, FlowPrimitive,
    Stage,
};

const HEADER_TEXT: &str = "New studies via databases and registers";

struct TextBox {
    lines: Vec<String>,
    align: Align,
    height: f32,
    line_pitch: f32,
}

impl TextBox {
    fn fixed(lines: Vec<String>, align: Align, height: f32, line_pitch: f32) -> Self {
        Self {
            lines,
            align,
            height,
            line_pitch,
        }
    }

    fn sized(lines: Vec<String>, align: Align, sizing: BoxSizing, counted_lines: usize) -> Self {
        Self {
            lines,
            align,
            height: sizing.height(counted_lines),
            line_pitch: sizing.per_line,
        }
    }
}

struct StagePlan {
    stage: Stage,
    phase: Option<&'static str>,
    main: TextBox,
    side: Option<TextBox>,
}

/// Lay out the flow diagram with default geometry.
pub fn layout(counts: &StageCounts) -> FlowLayout {
    compute_flow_layout(counts, &PrismaConfig::default())
}

pub fn compute_flow_layout(counts: &StageCounts, config: &PrismaConfig) -> FlowLayout {
    for (field, value) in counts.negative_counts() {
        tracing::warn!(field, value, "negative PRISMA count passed through unchanged");
    }
    let eligibility_excluded = counts.eligibility_excluded();
    tracing::debug!(
        databases = counts.databases.len(),
        screening_reasons = counts.screening_exclusion_reasons.len(),
        eligibility_reasons = counts.excluded_reasons.len(),
        eligibility_excluded,
        "laying out PRISMA flow"
    );

    let mut builder = FlowBuilder::new(config);
    builder.header(HEADER_TEXT);
    for plan in stage_plans(counts, eligibility_excluded, config) {
        builder.stage(plan);
    }
    builder.finish(eligibility_excluded)
}

fn stage_plans(counts: &StageCounts, eligibility_excluded: i64, cfg: &PrismaConfig) -> Vec<StagePlan> {
    let not_retrieved = (counts.not_retrieved > 0).then(|| {
        TextBox::fixed(
            vec![
                "Reports not retrieved".to_string(),
                format!("(n = {})", counts.not_retrieved),
            ],
            Align::Center,
            cfg.not_retrieved_height,
            cfg.line_pitch,
        )
    });

    vec![
        StagePlan {
            stage: Stage::Identification,
            phase: Some("Identification"),
            main: identification_box(counts, cfg),
            side: Some(TextBox::fixed(
                vec![
                    "Records removed before screening:".to_string(),
                    String::new(),
                    format!("  Duplicate records (n = {})", counts.duplicates),
                ],
                Align::Left,
                cfg.removed_height,
                cfg.line_pitch,
            )),
        },
        StagePlan {
            stage: Stage::Screening,
            phase: Some("Screening"),
            main: TextBox::fixed(
                vec![
                    "Records screened".to_string(),
                    "(title and abstract)".to_string(),
                    format!("(n = {})", counts.screened),
                ],
                Align::Center,
                cfg.screening_height,
                cfg.line_pitch,
            ),
            side: Some(exclusion_box(
                ExclusionLabels::RECORDS,
                counts.excluded.unwrap_or(0),
                counts.excluded.is_some(),
                &counts.screening_exclusion_reasons,
                &[],
                cfg.screening_exclusion,
            )),
        },
        StagePlan {
            stage: Stage::Retrieval,
            phase: None,
            main: TextBox::fixed(
                vec![
                    "Reports sought for retrieval".to_string(),
                    format!("(n = {})", counts.retrieved),
                ],
                Align::Center,
                cfg.retrieval_height,
                cfg.line_pitch,
            ),
            side: not_retrieved,
        },
        StagePlan {
            stage: Stage::Eligibility,
            phase: None,
            main: TextBox::fixed(
                vec![
                    "Reports assessed for eligibility".to_string(),
                    format!("(n = {})", counts.assessed),
                ],
                Align::Center,
                cfg.eligibility_height,
                cfg.line_pitch,
            ),
            // A derived count is as good as a reported one here.
            side: Some(exclusion_box(
                ExclusionLabels::REPORTS,
                eligibility_excluded,
                true,
                &counts.excluded_reasons,
                &counts.protocol_exclusion_criteria,
                cfg.eligibility_exclusion,
            )),
        },
        StagePlan {
            stage: Stage::Included,
            phase: Some("Included"),
            main: TextBox::fixed(
                vec![
                    format!("New studies included in review (n = {})", counts.included),
                    format!("Reports of new included studies (n = {})", counts.included),
                ],
                Align::Center,
                cfg.included_height,
                cfg.line_pitch,
            ),
            side: None,
        },
    ]
}

fn identification_box(counts: &StageCounts, cfg: &PrismaConfig) -> TextBox {
    let mut lines = Vec::with_capacity(counts.databases.len() + 3);
    if counts.databases.is_empty() {
        lines.push("Records identified from".to_string());
        lines.push("database searches".to_string());
    } else {
        lines.push("Records identified from:".to_string());
        for db in &counts.databases {
            lines.push(format!("  {} (n = {})", db.name, db.hits));
        }
    }
    lines.push(String::new());
    lines.push(format!("Total records (n = {})", counts.identified));
    TextBox::sized(lines, Align::Left, cfg.identification, counts.databases.len())
}

struct ExclusionLabels {
    noun: &'static str,
    none_line: &'static str,
}

impl ExclusionLabels {
    const RECORDS: Self = Self {
        noun: "Records",
        none_line: "  No records excluded at this stage",
    };
    const REPORTS: Self = Self {
        noun: "Reports",
        none_line: "  No reports excluded at this stage",
    };
}

/// Side box for an exclusion stage.
///
/// Reasons (or, failing that, protocol criteria at `n = 0`) are listed one
/// per line under a totals line. Without a breakdown a confirmed zero gets an
/// explicit "none excluded" line; anything else gets the two-line label.
fn exclusion_box(
    labels: ExclusionLabels,
    total: i64,
    confirmed: bool,
    reasons: &ReasonCounts,
    criteria: &[String],
    sizing: BoxSizing,
) -> TextBox {
    let heading = format!("{} excluded (n = {total})", labels.noun);
    let lines = if !reasons.is_empty() {
        let mut lines = vec![heading, String::new()];
        lines.extend(
            reasons
                .iter()
                .map(|r| format!("  {} (n = {})", r.reason, r.count)),
        );
        lines
    } else if !criteria.is_empty() {
        let mut lines = vec![heading, String::new()];
        lines.extend(criteria.iter().map(|c| format!("  {c} (n = 0)")));
        lines
    } else if total == 0 && confirmed {
        vec![heading, String::new(), labels.none_line.to_string()]
    } else {
        let lines = vec![format!("{} excluded", labels.noun), format!("(n = {total})")];
        let count = lines.len();
        return TextBox::sized(lines, Align::Center, sizing, count);
    };
    let count = lines.len();
    TextBox::sized(lines, Align::Left, sizing, count)
}

struct FlowBuilder<'a> {
    cfg: &'a PrismaConfig,
    primitives: Vec<FlowPrimitive>,
    cursor: f32,
    lowest: f32,
    previous_main: Option<(Stage, f32)>,
}

impl<'a> FlowBuilder<'a> {
    fn new(cfg: &'a PrismaConfig) -> Self {
        Self {
            cfg,
            primitives: Vec::new(),
            cursor: cfg.top,
            lowest: cfg.top,
            previous_main: None,
        }
    }

    fn center_x(&self) -> f32 {
        self.cfg.main_x + self.cfg.main_width / 2.0
    }

    fn header(&mut self, text: &str) {
        self.primitives.push(FlowPrimitive::Header(BandLabel {
            x: self.cfg.main_x,
            y: self.cursor,
            width: self.cfg.main_width,
            height: self.cfg.header_height,
            text: text.to_string(),
        }));
        self.cursor -= self.cfg.header_height + self.cfg.header_gap;
    }

    fn stage(&mut self, plan: StagePlan) {
        let cfg = self.cfg;
        let top = self.cursor;
        let side_height = plan.side.as_ref().map(|s| s.height).unwrap_or(0.0);
        let extent = plan.main.height.max(side_height);
        let main_y = top - (extent - plan.main.height) / 2.0 - plan.main.height;

        if let Some((from, prev_bottom)) = self.previous_main {
            let x = self.center_x();
            self.primitives.push(FlowPrimitive::Arrow(ArrowSpec {
                from,
                to: plan.stage,
                start: (x, prev_bottom - cfg.arrow_inset),
                end: (x, main_y + plan.main.height + cfg.arrow_inset),
            }));
        }

        if let Some(text) = plan.phase {
            self.primitives.push(FlowPrimitive::Phase(BandLabel {
                x: cfg.phase_x,
                y: top - extent,
                width: cfg.phase_width,
                height: extent + cfg.phase_overhang,
                text: text.to_string(),
            }));
        }

        let main = BoxGeometry {
            stage: plan.stage,
            role: BoxRole::Main,
            x: cfg.main_x,
            y: main_y,
            width: cfg.main_width,
            height: plan.main.height,
            lines: plan.main.lines,
            align: plan.main.align,
            line_pitch: plan.main.line_pitch,
        };
        let main_mid = main.mid_y();
        let main_right = main.right();
        self.previous_main = Some((plan.stage, main.y));
        self.primitives.push(FlowPrimitive::Box(main));

        if let Some(side) = plan.side {
            let side = BoxGeometry {
                stage: plan.stage,
                role: BoxRole::Side,
                x: cfg.side_x,
                y: main_mid - side.height / 2.0,
                width: cfg.side_width,
                height: side.height,
                lines: side.lines,
                align: side.align,
                line_pitch: side.line_pitch,
            };
            let connector = ConnectorSpec {
                stage: plan.stage,
                start: (main_right, main_mid),
                end: (side.x, side.mid_y()),
            };
            self.primitives.push(FlowPrimitive::Box(side));
            self.primitives.push(FlowPrimitive::Connector(connector));
        }

        self.lowest = self.lowest.min(top - extent);
        self.cursor = top - extent - cfg.stage_gap;
    }

    fn finish(self, eligibility_excluded: i64) -> FlowLayout {
        let cfg = self.cfg;
        FlowLayout {
            primitives: self.primitives,
            y_min: self.lowest - cfg.bottom_margin,
            y_max: cfg.view_top,
            canvas_width: 100.0,
            px_per_unit: cfg.px_per_unit,
            title_band: cfg.title_band,
            text_size: cfg.text_size,
            left_text_inset: cfg.left_text_inset,
            title: cfg.title.clone(),
            subtitle: cfg.subtitle.clone(),
            eligibility_excluded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::DatabaseHits;

    fn scenario_b() -> StageCounts {
        StageCounts {
            identified: 100,
            duplicates: 20,
            screened: 80,
            excluded: Some(50),
            retrieved: 30,
            not_retrieved: 0,
            assessed: 30,
            included: 12,
            ..Default::default()
        }
    }

    #[test]
    fn derives_eligibility_exclusions() {
        let flow = layout(&scenario_b());
        assert_eq!(flow.eligibility_excluded, 18);
        let side = flow.side_box(Stage::Eligibility).unwrap();
        assert!(side.lines.iter().any(|l| l.contains("(n = 18)")));
    }

    #[test]
    fn five_main_boxes_joined_by_arrows() {
        let flow = layout(&scenario_b());
        let stages: Vec<Stage> = flow.main_boxes().map(|b| b.stage).collect();
        assert_eq!(stages, Stage::ALL);
        let arrows: Vec<(Stage, Stage)> = flow.arrows().map(|a| (a.from, a.to)).collect();
        assert_eq!(
            arrows,
            vec![
                (Stage::Identification, Stage::Screening),
                (Stage::Screening, Stage::Retrieval),
                (Stage::Retrieval, Stage::Eligibility),
                (Stage::Eligibility, Stage::Included),
            ]
        );
        assert!(flow.side_box(Stage::Retrieval).is_none());
        assert!(flow.side_box(Stage::Included).is_none());
        assert_eq!(flow.side_boxes().count(), 3);
    }

    #[test]
    fn not_retrieved_box_appears_when_positive() {
        let counts = StageCounts {
            not_retrieved: 4,
            ..scenario_b()
        };
        let flow = layout(&counts);
        let side = flow.side_box(Stage::Retrieval).unwrap();
        assert_eq!(side.lines, vec!["Reports not retrieved", "(n = 4)"]);
    }

    #[test]
    fn arrows_run_from_bottom_centre_to_top_centre() {
        let flow = layout(&scenario_b());
        let cfg = PrismaConfig::default();
        for arrow in flow.arrows() {
            let from = flow.main_box(arrow.from).unwrap();
            let to = flow.main_box(arrow.to).unwrap();
            assert_eq!(arrow.start.0, from.center_x());
            assert_eq!(arrow.end.0, to.center_x());
            assert!((arrow.start.1 - (from.y - cfg.arrow_inset)).abs() < 1e-4);
            assert!((arrow.end.1 - (to.top() + cfg.arrow_inset)).abs() < 1e-4);
            assert!(arrow.start.1 > arrow.end.1);
        }
    }

    #[test]
    fn connectors_join_midpoints() {
        let flow = layout(&scenario_b());
        for connector in flow.connectors() {
            let main = flow.main_box(connector.stage).unwrap();
            let side = flow.side_box(connector.stage).unwrap();
            assert_eq!(connector.start, (main.right(), main.mid_y()));
            assert_eq!(connector.end, (side.x, side.mid_y()));
            assert!((main.mid_y() - side.mid_y()).abs() < 1e-4);
        }
    }

    #[test]
    fn empty_database_list_uses_generic_label() {
        let flow = layout(&scenario_b());
        let id = flow.main_box(Stage::Identification).unwrap();
        assert_eq!(id.lines[0], "Records identified from");
        assert_eq!(id.lines[1], "database searches");
        assert_eq!(id.lines.last().unwrap(), "Total records (n = 100)");
        assert_eq!(id.height, PrismaConfig::default().identification.min);
    }

    #[test]
    fn databases_are_listed_one_per_line() {
        let counts = StageCounts {
            databases: vec![DatabaseHits::new("Scopus", 60), DatabaseHits::new("IEEE Xplore", 40)],
            ..scenario_b()
        };
        let flow = layout(&counts);
        let id = flow.main_box(Stage::Identification).unwrap();
        assert_eq!(
            id.lines,
            vec![
                "Records identified from:",
                "  Scopus (n = 60)",
                "  IEEE Xplore (n = 40)",
                "",
                "Total records (n = 100)",
            ]
        );
    }

    #[test]
    fn confirmed_zero_exclusions_are_spelled_out() {
        let counts = StageCounts {
            excluded: Some(0),
            assessed: 12,
            included: 12,
            ..Default::default()
        };
        let flow = layout(&counts);
        let screening = flow.side_box(Stage::Screening).unwrap();
        assert!(screening.lines.contains(&"  No records excluded at this stage".to_string()));
        let eligibility = flow.side_box(Stage::Eligibility).unwrap();
        assert!(eligibility.lines.contains(&"  No reports excluded at this stage".to_string()));
    }

    #[test]
    fn unreported_screening_exclusions_use_two_line_label() {
        let flow = layout(&StageCounts::default());
        let screening = flow.side_box(Stage::Screening).unwrap();
        assert_eq!(screening.lines, vec!["Records excluded", "(n = 0)"]);
        assert_eq!(screening.align, Align::Center);
    }

    #[test]
    fn reasons_and_protocol_criteria_are_listed() {
        let counts = StageCounts {
            screening_exclusion_reasons: [("Off topic", 30), ("Not English", 20)]
                .into_iter()
                .collect(),
            protocol_exclusion_criteria: vec!["Grey literature".to_string()],
            ..scenario_b()
        };
        let flow = layout(&counts);
        let screening = flow.side_box(Stage::Screening).unwrap();
        assert_eq!(
            screening.lines,
            vec![
                "Records excluded (n = 50)",
                "",
                "  Off topic (n = 30)",
                "  Not English (n = 20)",
            ]
        );
        let eligibility = flow.side_box(Stage::Eligibility).unwrap();
        assert_eq!(eligibility.lines[2], "  Grey literature (n = 0)");
    }

    #[test]
    fn explicit_negative_counts_pass_through() {
        let counts = StageCounts {
            excluded_fulltext: Some(-2),
            ..scenario_b()
        };
        let flow = layout(&counts);
        assert_eq!(flow.eligibility_excluded, -2);
        let eligibility = flow.side_box(Stage::Eligibility).unwrap();
        assert_eq!(eligibility.lines, vec!["Reports excluded", "(n = -2)"]);
    }

    #[test]
    fn render_order_is_stage_by_stage() {
        let flow = layout(&scenario_b());
        let kinds: Vec<&str> = flow
            .primitives
            .iter()
            .map(|p| match p {
                FlowPrimitive::Header(_) => "header",
                FlowPrimitive::Phase(_) => "phase",
                FlowPrimitive::Box(b) if b.role == BoxRole::Main => "main",
                FlowPrimitive::Box(_) => "side",
                FlowPrimitive::Connector(_) => "connector",
                FlowPrimitive::Arrow(_) => "arrow",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "header", "phase", "main", "side", "connector", // identification
                "arrow", "phase", "main", "side", "connector", // screening
                "arrow", "main", // retrieval
                "arrow", "main", "side", "connector", // eligibility
                "arrow", "phase", "main", // included
            ]
        );
    }

    #[test]
    fn tall_side_box_pushes_following_stages_down() {
        let many: ReasonCounts = (0..50).map(|i| (format!("Reason {i}"), 1)).collect();
        let counts = StageCounts {
            screening_exclusion_reasons: many,
            ..scenario_b()
        };
        let flow = layout(&counts);
        let screening_side = flow.side_box(Stage::Screening).unwrap();
        let eligibility_side = flow.side_box(Stage::Eligibility).unwrap();
        let retrieval = flow.main_box(Stage::Retrieval).unwrap();
        assert!(!screening_side.overlaps_vertically(eligibility_side));
        assert!(retrieval.top() < screening_side.y);
        assert!(flow.y_min < screening_side.y);
    }

    #[test]
    fn visible_range_ends_below_included_box() {
        let flow = layout(&scenario_b());
        let included = flow.main_box(Stage::Included).unwrap();
        assert!((flow.y_min - (included.y - 3.0)).abs() < 1e-4);
        assert_eq!(flow.y_max, 98.0);
    }
}
