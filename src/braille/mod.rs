mod canvas;

pub use canvas::{BrailleCanvas, Cell};
