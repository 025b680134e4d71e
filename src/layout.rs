// Sheet geometry: physical print size to pixel grid

use crate::error::{SheetError, SheetResult};

// ============================================================================
// Constants
// ============================================================================

/// Square print size in mm
pub const SHEET_SIZE_MM: f64 = 120.0;

/// Print resolution
pub const SHEET_DPI: u32 = 300;

/// Grid shape
pub const GRID_ROWS: u32 = 6;
pub const GRID_COLS: u32 = 6;

/// Hand-tuned pixel geometry. These do not derive from the sheet size; the
/// leftover space below the grid is footer room.
pub const MARGIN_PX: u32 = 12;
pub const CELL_PADDING_PX: u32 = 4;
pub const CELL_WIDTH_PX: u32 = 228;
pub const CELL_HEIGHT_PX: u32 = 175;

/// Gap between the bottom of the grid and the first footer line
pub const FOOTER_OFFSET_PX: u32 = 20;

const MM_PER_INCH: f64 = 25.4;

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalSheetSpec {
    pub size_mm: f64,
    pub dpi: u32,
}

impl PhysicalSheetSpec {
    /// Edge length of the square canvas: round(size_mm / 25.4 * dpi)
    pub fn canvas_px(&self) -> u32 {
        (self.size_mm / MM_PER_INCH * self.dpi as f64).round() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    pub rows: u32,
    pub cols: u32,
    pub margin_px: u32,
    pub cell_padding_px: u32,
    pub cell_width_px: u32,
    pub cell_height_px: u32,
}

impl GridSpec {
    pub fn capacity(&self) -> usize {
        (self.rows as u64 * self.cols as u64) as usize
    }

    /// Saturates instead of overflowing, so oversized specs fail validation.
    pub fn grid_width_px(&self) -> u64 {
        span(self.cols, self.cell_width_px, self.cell_padding_px)
    }

    pub fn grid_height_px(&self) -> u64 {
        span(self.rows, self.cell_height_px, self.cell_padding_px)
    }
}

/// `count` cells of `size` with `padding` between them
fn span(count: u32, size: u32, padding: u32) -> u64 {
    let cells = count as u64 * size as u64;
    let gaps = count.saturating_sub(1) as u64 * padding as u64;
    cells.saturating_add(gaps)
}

/// Pixel origin of one populated cell, derived from its row-major index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPlacement {
    pub index: usize,
    pub row: u32,
    pub col: u32,
    pub origin_x: u32,
    pub origin_y: u32,
}

/// Validated sheet geometry. Built once at startup and passed by reference to
/// the compositor.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetConfig {
    sheet: PhysicalSheetSpec,
    grid: GridSpec,
    footer_offset_px: u32,
    canvas_px: u32,
}

// ============================================================================
// Construction & Validation
// ============================================================================

impl SheetConfig {
    /// The 120mm @ 300 DPI, 6x6 index sheet.
    pub fn standard() -> SheetResult<Self> {
        Self::new(
            PhysicalSheetSpec {
                size_mm: SHEET_SIZE_MM,
                dpi: SHEET_DPI,
            },
            GridSpec {
                rows: GRID_ROWS,
                cols: GRID_COLS,
                margin_px: MARGIN_PX,
                cell_padding_px: CELL_PADDING_PX,
                cell_width_px: CELL_WIDTH_PX,
                cell_height_px: CELL_HEIGHT_PX,
            },
            FOOTER_OFFSET_PX,
        )
    }

    pub fn new(sheet: PhysicalSheetSpec, grid: GridSpec, footer_offset_px: u32) -> SheetResult<Self> {
        if !(sheet.size_mm.is_finite() && sheet.size_mm > 0.0) {
            return Err(SheetError::Configuration(format!(
                "sheet size must be positive, got {}mm",
                sheet.size_mm
            )));
        }
        if sheet.dpi == 0 {
            return Err(SheetError::Configuration("dpi must be positive".to_string()));
        }
        if grid.rows == 0 || grid.cols == 0 {
            return Err(SheetError::Configuration(format!(
                "grid must have at least one cell, got {}x{}",
                grid.rows, grid.cols
            )));
        }
        if grid.cell_width_px == 0 || grid.cell_height_px == 0 {
            return Err(SheetError::Configuration(format!(
                "cell size must be positive, got {}x{}",
                grid.cell_width_px, grid.cell_height_px
            )));
        }

        let canvas_px = sheet.canvas_px();

        let grid_right = (grid.margin_px as u64).saturating_add(grid.grid_width_px());
        if grid_right > canvas_px as u64 {
            return Err(SheetError::Configuration(format!(
                "grid width {}px plus margin {}px exceeds canvas {}px",
                grid.grid_width_px(),
                grid.margin_px,
                canvas_px
            )));
        }

        let grid_bottom = (grid.margin_px as u64).saturating_add(grid.grid_height_px());
        if grid_bottom > canvas_px as u64 {
            return Err(SheetError::Configuration(format!(
                "grid height {}px plus margin {}px exceeds canvas {}px",
                grid.grid_height_px(),
                grid.margin_px,
                canvas_px
            )));
        }

        // footer band may be empty but never negative
        if grid_bottom.saturating_add(footer_offset_px as u64 + grid.margin_px as u64) > canvas_px as u64 {
            return Err(SheetError::Configuration(format!(
                "no room for footer: grid ends at {}px, canvas is {}px",
                grid_bottom, canvas_px
            )));
        }

        Ok(SheetConfig {
            sheet,
            grid,
            footer_offset_px,
            canvas_px,
        })
    }
}

// ============================================================================
// Derived Geometry
// ============================================================================

impl SheetConfig {
    pub fn sheet(&self) -> &PhysicalSheetSpec {
        &self.sheet
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn canvas_px(&self) -> u32 {
        self.canvas_px
    }

    pub fn capacity(&self) -> usize {
        self.grid.capacity()
    }

    pub fn cell_size(&self) -> (u32, u32) {
        (self.grid.cell_width_px, self.grid.cell_height_px)
    }

    /// Placement for the i-th image, or None if the grid is already full.
    pub fn cell_placement(&self, index: usize) -> Option<CellPlacement> {
        if index >= self.capacity() {
            return None;
        }
        let g = &self.grid;
        let row = index as u32 / g.cols;
        let col = index as u32 % g.cols;
        // validated geometry keeps every origin inside the canvas
        let origin = |i: u32, size: u32| {
            (g.margin_px as u64 + i as u64 * (size as u64 + g.cell_padding_px as u64)) as u32
        };
        Some(CellPlacement {
            index,
            row,
            col,
            origin_x: origin(col, g.cell_width_px),
            origin_y: origin(row, g.cell_height_px),
        })
    }

    /// Row-major placements for the first `count` images that fit.
    pub fn cell_placements(&self, count: usize) -> impl Iterator<Item = CellPlacement> + '_ {
        (0..count.min(self.capacity())).filter_map(move |i| self.cell_placement(i))
    }

    /// Bottom edge of the last grid row
    pub fn grid_bottom(&self) -> u32 {
        (self.grid.margin_px as u64 + self.grid.grid_height_px()) as u32
    }

    pub fn footer_offset_px(&self) -> u32 {
        self.footer_offset_px
    }

    pub fn footer_top(&self) -> u32 {
        self.grid_bottom() + self.footer_offset_px
    }

    pub fn footer_height(&self) -> u32 {
        self.canvas_px - self.footer_top() - self.grid.margin_px
    }

    pub fn margin_px(&self) -> u32 {
        self.grid.margin_px
    }
}
