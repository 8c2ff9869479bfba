use crate::layout::{DiagramData, Layout};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Layout geometry as written by `--dump-layout`. Flow diagrams also get a
/// flat list of boxes and arrows for quick inspection.
#[derive(Debug, Serialize)]
pub struct LayoutDump<'a> {
    pub kind: &'static str,
    pub width: f32,
    pub height: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub boxes: Vec<BoxDump>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arrows: Vec<ArrowDump>,
    pub diagram: &'a DiagramData,
}

#[derive(Debug, Serialize)]
pub struct BoxDump {
    pub stage: String,
    pub role: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub lines: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ArrowDump {
    pub from: String,
    pub to: String,
    pub points: Vec<[f32; 2]>,
}

impl<'a> LayoutDump<'a> {
    pub fn from_layout(layout: &'a Layout) -> Self {
        let (boxes, arrows) = match &layout.diagram {
            DiagramData::Flow(flow) => {
                let boxes = flow
                    .boxes()
                    .map(|geometry| BoxDump {
                        stage: format!("{:?}", geometry.stage),
                        role: format!("{:?}", geometry.role),
                        x: geometry.x,
                        y: geometry.y,
                        width: geometry.width,
                        height: geometry.height,
                        lines: geometry.lines.clone(),
                    })
                    .collect();
                let arrows = flow
                    .arrows()
                    .map(|arrow| ArrowDump {
                        from: format!("{:?}", arrow.from),
                        to: format!("{:?}", arrow.to),
                        points: vec![
                            [arrow.start.0, arrow.start.1],
                            [arrow.end.0, arrow.end.1],
                        ],
                    })
                    .collect();
                (boxes, arrows)
            }
            _ => (Vec::new(), Vec::new()),
        };

        LayoutDump {
            kind: layout.kind.key(),
            width: layout.width,
            height: layout.height,
            boxes,
            arrows,
            diagram: &layout.diagram,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::compute_layout;
    use crate::request::{ChartRequest, StageCounts};
    use crate::theme::Theme;

    #[test]
    fn flow_dump_lists_boxes_and_arrows() {
        let request = ChartRequest::Prisma(StageCounts {
            identified: 100,
            duplicates: 20,
            screened: 80,
            excluded: Some(50),
            retrieved: 30,
            assessed: 30,
            included: 12,
            ..StageCounts::default()
        });
        let layout =
            compute_layout(&request, &Theme::academic(), &LayoutConfig::default()).unwrap();
        let dump = LayoutDump::from_layout(&layout);
        assert_eq!(dump.kind, "prisma");
        assert_eq!(dump.arrows.len(), 4);
        assert!(dump.boxes.iter().any(|b| b.role == "Side"));

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["diagram"]["type"], "flow");
        assert_eq!(json["boxes"][0]["stage"], "Identification");
    }
}
