use serde::{Deserialize, Deserializer, Serialize, de};

use crate::strategy::StrategyKind;

/// Default saw blade width in millimetres.
pub const DEFAULT_KERF: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    #[serde(rename = "width", deserialize_with = "deserialize_u32_from_number")]
    pub w: u32,
    #[serde(rename = "height", deserialize_with = "deserialize_u32_from_number")]
    pub h: u32,
}

impl Rect {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn rotated(&self) -> Self {
        Self {
            w: self.h,
            h: self.w,
        }
    }

    pub fn fits_in(&self, other: &Rect) -> bool {
        self.w <= other.w && self.h <= other.h
    }

    /// True if the rect fits `other` natively or, when allowed, turned 90°.
    pub fn fits_in_any(&self, other: &Rect, allow_rotate: bool) -> bool {
        self.fits_in(other) || (allow_rotate && self.rotated().fits_in(other))
    }

    pub fn is_degenerate(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Accepts any non-negative integral JSON number (`1200` or `1200.0`).
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let n = f64::deserialize(deserializer)?;
    if n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
        return Err(de::Error::custom(format!(
            "expected a non-negative whole number, got {n}"
        )));
    }
    Ok(n as u32)
}

fn default_quantity() -> u32 {
    1
}

fn default_kerf() -> u32 {
    DEFAULT_KERF
}

/// A required piece as supplied by the geometry importer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub id: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub height: u32,
    #[serde(
        default = "default_quantity",
        deserialize_with = "deserialize_u32_from_number"
    )]
    pub quantity: u32,
    pub material: String,
    /// Width and height may not be swapped.
    #[serde(default)]
    pub grain_locked: bool,
}

impl Piece {
    pub fn new(id: &str, width: u32, height: u32, quantity: u32, material: &str) -> Self {
        Self {
            id: id.to_string(),
            width,
            height,
            quantity,
            material: material.to_string(),
            grain_locked: false,
        }
    }

    pub fn with_grain_locked(mut self, grain_locked: bool) -> Self {
        self.grain_locked = grain_locked;
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.height)
    }

    pub fn allow_rotate(&self) -> bool {
        !self.grain_locked
    }
}

/// A single unit of a [`Piece`] waiting to be packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceInstance {
    pub piece_id: String,
    /// Index of the source piece in the input list.
    pub source: usize,
    pub rect: Rect,
    pub allow_rotate: bool,
    pub material: String,
}

impl PieceInstance {
    /// Expands piece quantities into individual instances, in input order.
    pub fn expand(pieces: &[Piece]) -> Vec<PieceInstance> {
        let mut instances = Vec::new();
        for (source, piece) in pieces.iter().enumerate() {
            for _ in 0..piece.quantity {
                instances.push(PieceInstance {
                    piece_id: piece.id.clone(),
                    source,
                    rect: piece.rect(),
                    allow_rotate: piece.allow_rotate(),
                    material: piece.material.clone(),
                });
            }
        }
        instances
    }
}

/// Stock sheet template from the material catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetTemplate {
    pub id: String,
    pub material: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub height: u32,
    #[serde(default)]
    pub unit_cost: f64,
}

impl SheetTemplate {
    pub fn new(id: &str, material: &str, width: u32, height: u32, unit_cost: f64) -> Self {
        Self {
            id: id.to_string(),
            material: material.to_string(),
            width,
            height,
            unit_cost,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.height)
    }
}

/// An empty region on a sheet instance, origin at its lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreeRect {
    pub x: u32,
    pub y: u32,
    pub rect: Rect,
}

impl FreeRect {
    pub fn new(x: u32, y: u32, rect: Rect) -> Self {
        Self { x, y, rect }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub piece_id: String,
    pub sheet_index: usize,
    pub x: u32,
    pub y: u32,
    /// Footprint after rotation.
    pub rect: Rect,
    pub rotated: bool,
}

impl Placement {
    pub fn right(&self) -> u32 {
        self.x + self.rect.w
    }

    pub fn top(&self) -> u32 {
        self.y + self.rect.h
    }
}

/// One concrete sheet allocated during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetLayout {
    pub index: usize,
    pub template_id: String,
    pub material: String,
    pub stock: Rect,
    pub unit_cost: f64,
    pub placements: Vec<Placement>,
    pub free_rects: Vec<FreeRect>,
}

impl SheetLayout {
    pub fn used_area(&self) -> u64 {
        self.placements.iter().map(|p| p.rect.area()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub kerf: u32,
    pub sheets: Vec<SheetLayout>,
}

impl Layout {
    pub fn empty(kerf: u32) -> Self {
        Self {
            kerf,
            sheets: Vec::new(),
        }
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.sheets.iter().flat_map(|s| &s.placements)
    }

    pub fn placed_count(&self, piece_id: &str) -> usize {
        self.placements().filter(|p| p.piece_id == piece_id).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnplacedReason {
    /// Larger than every sheet of its material in both orientations.
    PieceUnplaceable,
}

impl std::fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnplacedReason::PieceUnplaceable => {
                write!(f, "piece exceeds every sheet of its material in both orientations")
            }
        }
    }
}

/// One piece instance the run could not place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unplaced {
    pub piece_id: String,
    pub reason: UnplacedReason,
}

/// A complete optimization request, as read from JSON by the binaries.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Job {
    pub sheets: Vec<SheetTemplate>,
    pub pieces: Vec<Piece>,
    #[serde(
        default = "default_kerf",
        deserialize_with = "deserialize_u32_from_number"
    )]
    pub kerf: u32,
    #[serde(default)]
    pub strategy: StrategyKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_fits_any() {
        let piece = Rect::new(50, 100);
        let stock = Rect::new(100, 50);
        assert!(!piece.fits_in(&stock));
        assert!(piece.fits_in_any(&stock, true));
        assert!(!piece.fits_in_any(&stock, false));
    }

    #[test]
    fn test_job_from_json() {
        let json = r#"{
            "sheets": [{"id": "mdf-std", "material": "mdf18", "width": 2440, "height": 1220.0, "unit_cost": 42.5}],
            "pieces": [
                {"id": "side", "width": 800, "height": 400, "quantity": 2, "material": "mdf18", "grain_locked": true},
                {"id": "shelf", "width": 600, "height": 300, "material": "mdf18"}
            ],
            "strategy": "best_fit_decreasing"
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.kerf, DEFAULT_KERF);
        assert_eq!(job.strategy, StrategyKind::BestFitDecreasing);
        assert_eq!(job.sheets[0].rect(), Rect::new(2440, 1220));
        assert!(job.pieces[0].grain_locked);
        assert_eq!(job.pieces[1].quantity, 1);
        assert!(job.pieces[1].allow_rotate());
    }

    #[test]
    fn test_rejects_fractional_dimension() {
        let json = r#"{"id": "a", "width": 10.5, "height": 20, "material": "m"}"#;
        assert!(serde_json::from_str::<Piece>(json).is_err());
        let json = r#"{"id": "a", "width": -10, "height": 20, "material": "m"}"#;
        assert!(serde_json::from_str::<Piece>(json).is_err());
    }
}
