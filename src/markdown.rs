//! Markdown summary → typed display blocks.
//!
//! Summaries come back from the LLM as loosely-structured markdown. This
//! module maps them line by line onto a small set of [`Block`]s a front end
//! can render. The mapping is a pure function of the input text.
//!
//! Line rules, applied to each non-blank trimmed line in order:
//!
//! 1. `# text`, or a first line that looks like a bare title → [`Block::Title`]
//! 2. `## text` → [`Block::Heading`]
//! 3. `**text**` on its own line → [`Block::Subheading`]
//! 4. `- item` / `* item` → accumulated into one [`Block::BulletList`]
//! 5. a short line ending in `:` → [`Block::Subheading`]
//! 6. lines starting with `=` (setext underlines) are dropped
//! 7. anything else → [`Block::Paragraph`]

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Heading(String),
    Subheading(String),
    BulletList(Vec<String>),
    Paragraph(String),
}

pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut list: Vec<String> = Vec::new();

    let lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    for (index, line) in lines.enumerate() {
        if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            list.push(item.to_string());
            continue;
        }
        if line.starts_with('=') {
            continue;
        }

        flush_list(&mut list, &mut blocks);
        let block = if let Some(title) = line.strip_prefix("# ") {
            Block::Title(title.to_string())
        } else if index == 0 && looks_like_title(line) {
            Block::Title(line.to_string())
        } else if let Some(heading) = line.strip_prefix("## ") {
            Block::Heading(heading.to_string())
        } else if let Some(bold) = bold_line(line) {
            Block::Subheading(bold.to_string())
        } else if let Some(label) = line.strip_suffix(':').filter(|_| line.chars().count() < 50) {
            Block::Subheading(label.to_string())
        } else {
            Block::Paragraph(line.to_string())
        };
        blocks.push(block);
    }

    flush_list(&mut list, &mut blocks);
    blocks
}

/// Plain-text rendering of `blocks` for a terminal.
pub fn render_plain(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Title(t) => {
                out.push_str(&format!("{}\n{}\n\n", t, "=".repeat(t.chars().count())));
            }
            Block::Heading(t) => {
                out.push_str(&format!("{}\n{}\n", t, "-".repeat(t.chars().count())));
            }
            Block::Subheading(t) => {
                out.push_str(t);
                out.push('\n');
            }
            Block::BulletList(items) => {
                for item in items {
                    out.push_str(&format!("  • {}\n", item));
                }
                out.push('\n');
            }
            Block::Paragraph(t) => {
                out.push_str(t);
                out.push_str("\n\n");
            }
        }
    }
    out.trim_end().to_string()
}

fn flush_list(list: &mut Vec<String>, blocks: &mut Vec<Block>) {
    if !list.is_empty() {
        blocks.push(Block::BulletList(std::mem::take(list)));
    }
}

fn looks_like_title(line: &str) -> bool {
    let len = line.chars().count();
    !line.starts_with('*')
        && !line.starts_with('-')
        && !line.starts_with("##")
        && len > 5
        && len < 100
        && !line.ends_with('.')
        && !line.contains(':')
}

fn bold_line(line: &str) -> Option<&str> {
    line.strip_prefix("**")?.strip_suffix("**")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_typical_summary() {
        let text = "# Rust Ownership\n\n## Key Points\n- Moves transfer ownership\n- Borrows are checked\n\n* Lifetimes bound references\n**Details**\nThe borrow checker runs at compile time.\nConclusion:\n";
        assert_eq!(
            parse_blocks(text),
            vec![
                Block::Title("Rust Ownership".into()),
                Block::Heading("Key Points".into()),
                Block::BulletList(vec![
                    "Moves transfer ownership".into(),
                    "Borrows are checked".into(),
                    "Lifetimes bound references".into(),
                ]),
                Block::Subheading("Details".into()),
                Block::Paragraph("The borrow checker runs at compile time.".into()),
                Block::Subheading("Conclusion".into()),
            ]
        );
    }

    #[test]
    fn bare_first_line_may_be_a_title() {
        let blocks = parse_blocks("Quarterly Report Overview\nRevenue grew.");
        assert_eq!(blocks[0], Block::Title("Quarterly Report Overview".into()));

        let blocks = parse_blocks("Revenue grew this quarter.\nMore text");
        assert_eq!(blocks[0], Block::Paragraph("Revenue grew this quarter.".into()));
    }

    #[test]
    fn setext_underlines_are_dropped() {
        let blocks = parse_blocks("A sentence here.\n=====\nNext.");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph("A sentence here.".into()),
                Block::Paragraph("Next.".into()),
            ]
        );
    }

    #[test]
    fn long_colon_lines_stay_paragraphs() {
        let line = "This sentence is long enough that it should not be a header at all:";
        assert_eq!(parse_blocks(&format!("x.\n{}", line))[1], Block::Paragraph(line.into()));
    }

    #[test]
    fn colon_rule_counts_characters_not_bytes() {
        let line = "Ключевые выводы исследования:";
        assert!(line.len() >= 50);
        assert_eq!(
            parse_blocks(&format!("x.\n{}", line))[1],
            Block::Subheading("Ключевые выводы исследования".into())
        );
    }

    #[test]
    fn render_plain_underlines_titles_and_headings() {
        let out = render_plain(&parse_blocks("# Ünïcode\n## Key\nBody text."));
        assert_eq!(out, "Ünïcode\n=======\n\nKey\n---\nBody text.");
    }

    #[test]
    fn render_plain_lists_bullets() {
        let out = render_plain(&parse_blocks("# T\n- a\n- b"));
        assert_eq!(out, "T\n=\n\n  • a\n  • b");
    }
}
