use std::fs;
use std::path::Path;

use crate::card::{parse_card, BOUNDARY_CARD};
use crate::error::ExportError;

/// Number of boundary cards a complete file contains.
const BOUNDARY_COUNT: usize = 2;

/// Reduce raw lines to canonical cards, one per line.
///
/// Comments, whitespace, and blank lines are dropped. Missing boundary cards are appended at the
/// end, so the result always has at least two.
///
/// `file` is only used for error messages.
pub fn clean<S: AsRef<str>>(lines: &[S], file: &str) -> Result<Vec<String>, ExportError> {
    let mut cards = Vec::with_capacity(lines.len() + BOUNDARY_COUNT);
    let mut boundaries = 0;

    for (index, line) in lines.iter().enumerate() {
        let card = parse_card(line.as_ref()).map_err(|_| ExportError::Format {
            line: index + 1,
            file: file.to_string(),
        })?;
        let Some(card) = card else {
            continue;
        };
        if card.is_boundary() {
            boundaries += 1;
        }
        cards.push(card.to_string());
    }

    for _ in boundaries..BOUNDARY_COUNT {
        cards.push(BOUNDARY_CARD.to_string());
    }
    Ok(cards)
}

/// Clean a card file and write the result to `output`.
///
/// Nothing is written if the input contains a malformed card.
pub fn export_file(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<usize, ExportError> {
    let input_name = input.as_ref().display().to_string();
    let contents = fs::read_to_string(input.as_ref()).map_err(|_| ExportError::Read {
        file: input_name.clone(),
    })?;
    let lines: Vec<&str> = contents.lines().collect();
    let cards = clean(&lines, &input_name)?;

    let mut text = cards.join("\n");
    text.push('\n');
    fs::write(output.as_ref(), text).map_err(|_| ExportError::Write {
        file: output.as_ref().display().to_string(),
    })?;
    Ok(cards.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_blanks() {
        let cards = clean(
            &[
                "; header comment",
                "+0 000 000 005   ; five",
                "",
                "  +9999999999",
                "+8 000 000 000",
                "\t-8 000 000 000 ;",
                "+9 000 000 000",
                "+9999999999",
                "+0000000042",
            ],
            "prog.txt",
        )
        .unwrap();
        assert_eq!(
            cards,
            [
                "+0000000005",
                "+9999999999",
                "+8000000000",
                "-8000000000",
                "+9000000000",
                "+9999999999",
                "+0000000042",
            ]
        );
    }

    #[test]
    fn tops_up_boundaries() {
        let cards = clean(&["+0000000001"], "prog.txt").unwrap();
        assert_eq!(cards, ["+0000000001", "+9999999999", "+9999999999"]);

        let cards = clean(&["+9999999999", "+9000000000"], "prog.txt").unwrap();
        assert_eq!(cards, ["+9999999999", "+9000000000", "+9999999999"]);

        let empty: [&str; 0] = [];
        assert_eq!(
            clean(&empty, "prog.txt").unwrap(),
            ["+9999999999", "+9999999999"]
        );
    }

    #[test]
    fn extra_boundaries_are_kept() {
        let cards = clean(&["+9999999999"; 3], "prog.txt").unwrap();
        assert_eq!(cards.len(), 3);
    }

    #[test]
    fn format_error_names_line() {
        let err = clean(&["+0000000001", "", "+12 34"], "prog.txt").unwrap_err();
        assert_eq!(
            err,
            ExportError::Format {
                line: 3,
                file: "prog.txt".into()
            }
        );
        assert_eq!(
            err.to_string(),
            "Invalid card format on line 3 of prog.txt"
        );
    }

    #[test]
    fn writes_file() {
        let dir = std::env::temp_dir().join(format!("cardvm-export-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("in.txt");
        let output = dir.join("out.txt");

        fs::write(&input, "+0000000001 ; one\n\n+9999999999\n+9 000 000 000\n").unwrap();
        assert_eq!(export_file(&input, &output).unwrap(), 4);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "+0000000001\n+9999999999\n+9000000000\n+9999999999\n"
        );

        fs::write(&input, "nonsense\n").unwrap();
        fs::remove_file(&output).unwrap();
        assert!(matches!(
            export_file(&input, &output),
            Err(ExportError::Format { line: 1, .. })
        ));
        assert!(!output.exists());

        assert!(matches!(
            export_file(dir.join("missing.txt"), &output),
            Err(ExportError::Read { .. })
        ));

        fs::remove_dir_all(&dir).unwrap();
    }
}
