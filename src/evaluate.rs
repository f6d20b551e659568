use serde::Serialize;

use crate::types::Layout;

/// Points deducted from the optimization score per extra sheet.
const EXTRA_SHEET_PENALTY: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetMetrics {
    pub index: usize,
    pub template_id: String,
    pub material: String,
    pub piece_count: usize,
    pub used_area: u64,
    pub sheet_area: u64,
    pub waste_area: u64,
    pub waste_percent: f64,
    pub utilization_percent: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialMetrics {
    pub material: String,
    pub sheet_count: usize,
    pub used_area: u64,
    pub sheet_area: u64,
    pub cost: f64,
}

/// Per-sheet and project-level figures for a layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub sheets: Vec<SheetMetrics>,
    /// In order of first use.
    pub materials: Vec<MaterialMetrics>,
    pub sheet_count: usize,
    pub piece_count: usize,
    pub used_area: u64,
    pub sheet_area: u64,
    pub waste_area: u64,
    pub waste_percent: f64,
    pub utilization_percent: f64,
    pub total_cost: f64,
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Used area counts actual piece material; kerf clearance is waste.
pub fn evaluate(layout: &Layout) -> Metrics {
    let sheets: Vec<SheetMetrics> = layout
        .sheets
        .iter()
        .map(|s| {
            let used_area = s.used_area();
            let sheet_area = s.stock.area();
            let waste_area = sheet_area - used_area;
            SheetMetrics {
                index: s.index,
                template_id: s.template_id.clone(),
                material: s.material.clone(),
                piece_count: s.placements.len(),
                used_area,
                sheet_area,
                waste_area,
                waste_percent: percent(waste_area, sheet_area),
                utilization_percent: percent(used_area, sheet_area),
                cost: s.unit_cost,
            }
        })
        .collect();

    let mut materials: Vec<MaterialMetrics> = Vec::new();
    for s in &sheets {
        let entry = match materials.iter().position(|m| m.material == s.material) {
            Some(i) => &mut materials[i],
            None => {
                materials.push(MaterialMetrics {
                    material: s.material.clone(),
                    sheet_count: 0,
                    used_area: 0,
                    sheet_area: 0,
                    cost: 0.0,
                });
                let last = materials.len() - 1;
                &mut materials[last]
            }
        };
        entry.sheet_count += 1;
        entry.used_area += s.used_area;
        entry.sheet_area += s.sheet_area;
        entry.cost += s.cost;
    }

    let used_area: u64 = sheets.iter().map(|s| s.used_area).sum();
    let sheet_area: u64 = sheets.iter().map(|s| s.sheet_area).sum();
    let waste_area = sheet_area - used_area;

    Metrics {
        sheet_count: sheets.len(),
        piece_count: sheets.iter().map(|s| s.piece_count).sum(),
        used_area,
        sheet_area,
        waste_area,
        waste_percent: percent(waste_area, sheet_area),
        utilization_percent: percent(used_area, sheet_area),
        total_cost: sheets.iter().map(|s| s.cost).sum(),
        sheets,
        materials,
    }
}

/// Optimization score in `0..=100`: mean sheet utilization, minus a flat
/// penalty for each sheet beyond the first.
pub fn score(metrics: &Metrics) -> f64 {
    if metrics.sheets.is_empty() {
        return 0.0;
    }
    let mean = metrics
        .sheets
        .iter()
        .map(|s| s.utilization_percent)
        .sum::<f64>()
        / metrics.sheets.len() as f64;
    let penalty = (metrics.sheets.len() - 1) as f64 * EXTRA_SHEET_PENALTY;
    (mean - penalty).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Placement, Rect, SheetLayout};

    fn sheet(index: usize, material: &str, cost: f64, pieces: &[(u32, u32, u32, u32)]) -> SheetLayout {
        SheetLayout {
            index,
            template_id: format!("{material}-std"),
            material: material.to_string(),
            stock: Rect::new(100, 100),
            unit_cost: cost,
            placements: pieces
                .iter()
                .map(|&(x, y, w, h)| Placement {
                    piece_id: "p".to_string(),
                    sheet_index: index,
                    x,
                    y,
                    rect: Rect::new(w, h),
                    rotated: false,
                })
                .collect(),
            free_rects: vec![],
        }
    }

    #[test]
    fn test_empty_layout() {
        let m = evaluate(&Layout::empty(3));
        assert_eq!(m.sheet_count, 0);
        assert_eq!(m.waste_area, 0);
        assert_eq!(m.waste_percent, 0.0);
        assert_eq!(m.total_cost, 0.0);
        assert_eq!(score(&m), 0.0);
    }

    #[test]
    fn test_per_sheet_and_project_figures() {
        let layout = Layout {
            kerf: 0,
            sheets: vec![
                sheet(0, "mdf", 30.0, &[(0, 0, 100, 50), (0, 50, 50, 50)]),
                sheet(1, "ply", 50.0, &[(0, 0, 50, 50)]),
                sheet(2, "mdf", 30.0, &[]),
            ],
        };
        let m = evaluate(&layout);

        assert_eq!(m.sheets[0].used_area, 7500);
        assert_eq!(m.sheets[0].waste_area, 2500);
        assert!((m.sheets[0].waste_percent - 25.0).abs() < 1e-9);
        assert!((m.sheets[1].utilization_percent - 25.0).abs() < 1e-9);
        assert_eq!(m.sheets[2].waste_area, 10_000);

        assert_eq!(m.sheet_count, 3);
        assert_eq!(m.piece_count, 3);
        assert_eq!(m.used_area, 10_000);
        assert_eq!(m.sheet_area, 30_000);
        assert!((m.utilization_percent - 100.0 / 3.0).abs() < 1e-9);
        assert!((m.total_cost - 110.0).abs() < 1e-9);

        assert_eq!(m.materials.len(), 2);
        assert_eq!(m.materials[0].material, "mdf");
        assert_eq!(m.materials[0].sheet_count, 2);
        assert!((m.materials[0].cost - 60.0).abs() < 1e-9);
        assert_eq!(m.materials[1].material, "ply");
    }

    #[test]
    fn test_score_penalizes_extra_sheets() {
        let one = evaluate(&Layout {
            kerf: 0,
            sheets: vec![sheet(0, "mdf", 1.0, &[(0, 0, 100, 80)])],
        });
        assert!((score(&one) - 80.0).abs() < 1e-9);

        let two = evaluate(&Layout {
            kerf: 0,
            sheets: vec![
                sheet(0, "mdf", 1.0, &[(0, 0, 100, 80)]),
                sheet(1, "mdf", 1.0, &[(0, 0, 100, 80)]),
            ],
        });
        assert!((score(&two) - 75.0).abs() < 1e-9);

        let sparse = evaluate(&Layout {
            kerf: 0,
            sheets: vec![sheet(0, "mdf", 1.0, &[]), sheet(1, "mdf", 1.0, &[])],
        });
        assert_eq!(score(&sparse), 0.0);
    }
}
