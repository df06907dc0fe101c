//! Conversions between the 1-based ranges the AST carries and the 0-based
//! positions on the wire. Every boundary crossing adjusts by one.

use elmls_core::span::{Position, Range};

pub fn to_lsp_position(pos: Position) -> lsp_types::Position {
    lsp_types::Position {
        line: pos.line.saturating_sub(1),
        character: pos.column.saturating_sub(1),
    }
}

pub fn to_lsp_range(range: Range) -> lsp_types::Range {
    lsp_types::Range {
        start: to_lsp_position(range.start),
        end: to_lsp_position(range.end),
    }
}

pub fn from_lsp_position(pos: lsp_types::Position) -> Position {
    Position {
        line: pos.line + 1,
        column: pos.character + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_across_the_boundary() {
        let internal = Position::new(3, 27);
        assert_eq!(from_lsp_position(to_lsp_position(internal)), internal);
        let wire = lsp_types::Position::new(0, 0);
        assert_eq!(to_lsp_position(from_lsp_position(wire)), wire);
    }

    #[test]
    fn one_based_to_zero_based() {
        let range = Range::from_coords(1, 1, 1, 4);
        let lsp = to_lsp_range(range);
        assert_eq!(lsp.start, lsp_types::Position::new(0, 0));
        assert_eq!(lsp.end, lsp_types::Position::new(0, 3));
    }
}
