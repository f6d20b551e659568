//! ASCII sheet diagrams for terminal output.

use crate::types::{Placement, SheetLayout};

const MAX_WIDTH: f64 = 80.0;
const MAX_HEIGHT: f64 = 40.0;

/// Draws one sheet with its origin at the bottom-left, labelling each
/// placement with its piece id.
pub fn render_sheet(sheet: &SheetLayout) -> String {
    let stock = sheet.stock;
    let scale = f64::min(MAX_WIDTH / stock.w as f64, MAX_HEIGHT / stock.h as f64);
    let grid_w = (stock.w as f64 * scale).round() as usize;
    let grid_h = (stock.h as f64 * scale).round() as usize;

    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; grid_h + 1];
    draw_rect(&mut grid, 0, 0, grid_w, grid_h);

    for p in &sheet.placements {
        let sx = (p.x as f64 * scale).round() as usize;
        let sy = (p.y as f64 * scale).round() as usize;
        let sw = (p.rect.w as f64 * scale).round() as usize;
        let sh = (p.rect.h as f64 * scale).round() as usize;

        if sw == 0 || sh == 0 {
            continue;
        }

        draw_rect(&mut grid, sx, sy, sw, sh);
        draw_label(&mut grid, p, sx, sy, sw, sh);
    }

    // Row 0 is y = 0, so print top-down in reverse.
    let mut result = String::new();
    for row in grid.iter().rev() {
        let line: String = row.iter().collect();
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result
}

fn draw_label(grid: &mut [Vec<char>], p: &Placement, sx: usize, sy: usize, sw: usize, sh: usize) {
    if sw <= 2 || sh < 2 {
        return;
    }
    let label = if p.rotated {
        format!("{}*", p.piece_id)
    } else {
        p.piece_id.clone()
    };
    let chars: Vec<char> = label.chars().collect();
    let cy = sy + sh / 2;
    let start_x = (sx + sw / 2).saturating_sub(chars.len() / 2);

    for (i, &ch) in chars.iter().enumerate() {
        let x = start_x + i;
        if x > sx && x < sx + sw && cy < grid.len() && x < grid[cy].len() {
            grid[cy][x] = ch;
        }
    }
}

fn mark(cell: &mut char, line: char) {
    let crossing = if line == '-' { '|' } else { '-' };
    *cell = if *cell == crossing || *cell == '+' {
        '+'
    } else {
        line
    };
}

fn draw_rect(grid: &mut [Vec<char>], x: usize, y: usize, w: usize, h: usize) {
    let rows = grid.len();
    let cols = match grid.first() {
        Some(row) => row.len(),
        None => return,
    };

    for i in x..=x + w {
        if i >= cols {
            break;
        }
        for j in [y, y + h] {
            if j < rows {
                mark(&mut grid[j][i], '-');
            }
        }
    }

    for j in y..=y + h {
        if j >= rows {
            break;
        }
        for i in [x, x + w] {
            if i < cols {
                mark(&mut grid[j][i], '|');
            }
        }
    }

    for cx in [x, x + w] {
        for cy in [y, y + h] {
            if cy < rows && cx < cols {
                grid[cy][cx] = '+';
            }
        }
    }
}
