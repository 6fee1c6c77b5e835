use bonds::BondGraph;
use std::fmt::Write;

/// Render the client-side loader text for one structure.
///
/// The format is a compatibility surface parsed positionally by the viewer,
/// so every byte matters: the raw record lines as a quoted array, the bond
/// pairs six to a line, then the max-length scalar with six decimals.
pub fn render_loader(lines: &[String], graph: &BondGraph) -> String {
    let mut out = String::new();

    out.push_str("var lines = [\n");
    for line in lines {
        out.push('"');
        out.push_str(line);
        out.push_str("\",\n");
    }
    out.push_str("];\n\n");

    out.push_str("var bond_pairs = [\n");
    for (n, (a, b)) in graph.pairs.iter().enumerate() {
        if n > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "[{a}, {b}]");
        if n % 6 == 5 {
            out.push('\n');
        }
    }
    out.push_str("\n];\n\n");

    let _ = write!(out, "var max_length = {:.6};", graph.max_length);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(pairs: Vec<(usize, usize)>, max_length: f64) -> BondGraph {
        BondGraph { pairs, max_length }
    }

    #[test]
    fn renders_fixed_input_byte_for_byte() {
        let lines = vec![
            "ATOM      1  N   GLY A   1       0.000   0.000   0.000  1.00  0.00           N"
                .to_string(),
            "ATOM      2  CA  GLY A   1       1.450   0.000   0.000  1.00  0.00           C"
                .to_string(),
        ];
        let graph = graph(vec![(0, 1)], 3.25);
        let expected = concat!(
            "var lines = [\n",
            "\"ATOM      1  N   GLY A   1       0.000   0.000   0.000  1.00  0.00           N\",\n",
            "\"ATOM      2  CA  GLY A   1       1.450   0.000   0.000  1.00  0.00           C\",\n",
            "];\n",
            "\n",
            "var bond_pairs = [\n",
            "[0, 1]\n",
            "];\n",
            "\n",
            "var max_length = 3.250000;",
        );
        assert_eq!(render_loader(&lines, &graph), expected);
    }

    #[test]
    fn groups_bond_pairs_six_per_line() {
        let pairs = (0..8).map(|n| (n, n + 1)).collect();
        let rendered = render_loader(&[], &graph(pairs, 0.0));
        let expected = concat!(
            "var lines = [\n",
            "];\n",
            "\n",
            "var bond_pairs = [\n",
            "[0, 1], [1, 2], [2, 3], [3, 4], [4, 5], [5, 6]\n",
            ", [6, 7], [7, 8]\n",
            "];\n",
            "\n",
            "var max_length = 0.000000;",
        );
        assert_eq!(rendered, expected);
    }

    #[test]
    fn empty_structure_still_renders_all_declarations() {
        let rendered = render_loader(&[], &graph(vec![], 0.0));
        assert!(rendered.starts_with("var lines = [\n];\n\n"));
        assert!(rendered.contains("var bond_pairs = [\n\n];\n\n"));
        assert!(rendered.ends_with("var max_length = 0.000000;"));
    }

    #[test]
    fn exactly_six_pairs_breaks_line_before_closing_bracket() {
        let pairs = (0..6).map(|n| (n, n + 1)).collect();
        let rendered = render_loader(&[], &graph(pairs, 1.0));
        assert!(rendered.contains("[4, 5], [5, 6]\n\n];"));
    }
}
