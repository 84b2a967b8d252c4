//! Prelude module - common imports for hoja users
//!
//! ```rust
//! use hoja::prelude::*;
//! ```

pub use crate::{
    // Calculation
    get_cell,
    recompute_sheet,
    update_cells,
    CalculationEngine,
    CalculationOptions,
    CalculationStats,
    CellUpdate,
    CycleDetection,
    RecomputeOrder,

    // Cells and grid
    coord_to_id,
    id_to_coord,
    Cell,
    CellError,
    CellRange,
    Coord,
    Sheet,
    SheetDocument,

    // Errors
    Error,
    Result,

    // Extension traits
    DocumentExt,
    SheetCalculationExt,
};
