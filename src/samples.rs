//! Seed content for new documents.

/// Sample document exercising every construct the preview renders.
pub const SAMPLE_DOCUMENT: &str = r#"# Heading One

## Heading Two

### Heading Three

Sample text with **bold**, _italic_, ~~struck~~ and `inline code`.
Bare links such as https://www.rust-lang.org are linked automatically.

---

> A sample blockquote.

- List item 1
- List item 2
  - Nested item

1. Step one
2. Step two

- [x] Done task
- [ ] Open task

```rust
// Sample code
fn main() {
    println!("Hello, world!");
}
```

| Column A | Column B |
|---|---|
| A1 | B1 |
| A2 | B2 |

Footnotes render at the end of the document.[^1]

[^1]: This is the footnote.
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::render_html;

    #[test]
    fn sample_covers_supported_constructs() {
        let html = render_html(SAMPLE_DOCUMENT);
        for tag in [
            "<h1>", "<h2>", "<h3>", "<strong>", "<em>", "<del>", "<code>", "<hr />",
            "<blockquote>", "<ul>", "<ol>", "<pre>", "<table>", "<thead>", "type=\"checkbox\"",
            "footnote-definition", "href=\"https://www.rust-lang.org\"",
        ] {
            assert!(html.contains(tag), "sample should render {tag}");
        }
    }
}
