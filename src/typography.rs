//! The typographic pass applied to every rendered entry body. Straight quotes
//! become curly quotes, `--` becomes an em dash and `...` becomes an
//! ellipsis. Only text between tags is rewritten; tags, comments, and the
//! contents of elements where punctuation is literal (`pre`, `code`, ...)
//! pass through untouched.

/// Elements whose text content must not be rewritten.
const LITERAL_ELEMENTS: &[&str] = &["pre", "code", "kbd", "script", "style", "math"];

const LEFT_DOUBLE: &str = "&#8220;";
const RIGHT_DOUBLE: &str = "&#8221;";
const LEFT_SINGLE: &str = "&#8216;";
const RIGHT_SINGLE: &str = "&#8217;";
const EM_DASH: &str = "&#8212;";
const ELLIPSIS: &str = "&#8230;";

/// Applies the typographic substitutions to an HTML fragment.
pub fn prettify(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + html.len() / 8);
    let mut state = State {
        prev: None,
        literal_depth: 0,
    };

    let mut rest = html;
    while !rest.is_empty() {
        if rest.starts_with("<!--") {
            let end = rest.find("-->").map_or(rest.len(), |i| i + 3);
            out.push_str(&rest[..end]);
            rest = &rest[end..];
        } else if rest.starts_with('<') {
            let end = rest.find('>').map_or(rest.len(), |i| i + 1);
            let tag = &rest[..end];
            state.on_tag(tag);
            out.push_str(tag);
            rest = &rest[end..];
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            let text = &rest[..end];
            if state.literal_depth > 0 {
                out.push_str(text);
            } else {
                state.on_text(&mut out, text);
            }
            rest = &rest[end..];
        }
    }
    out
}

struct State {
    /// The last character of text seen so far, as it reads after
    /// substitution. Quote direction depends on it.
    prev: Option<char>,

    /// How many literal elements enclose the current position.
    literal_depth: usize,
}

impl State {
    fn on_tag(&mut self, tag: &str) {
        let inner = tag.trim_start_matches('<');
        let (closing, inner) = match inner.strip_prefix('/') {
            Some(inner) => (true, inner),
            None => (false, inner),
        };
        let name: String = inner
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if !LITERAL_ELEMENTS.contains(&name.as_str()) || tag.ends_with("/>") {
            return;
        }
        if closing {
            self.literal_depth = self.literal_depth.saturating_sub(1);
        } else {
            self.literal_depth += 1;
        }
    }

    fn on_text(&mut self, out: &mut String, text: &str) {
        let mut rest = text;
        while let Some(c) = rest.chars().next() {
            let consumed = if rest.starts_with("...") {
                self.emit(out, ELLIPSIS, '…');
                3
            } else if rest.starts_with(". . .") {
                self.emit(out, ELLIPSIS, '…');
                5
            } else if rest.starts_with("--") {
                self.emit(out, EM_DASH, '—');
                2
            } else if rest.starts_with("``") {
                self.emit(out, LEFT_DOUBLE, '“');
                2
            } else if rest.starts_with("''") {
                self.emit(out, RIGHT_DOUBLE, '”');
                2
            } else if rest.starts_with("&quot;") {
                self.double_quote(out);
                "&quot;".len()
            } else if rest.starts_with("&#39;") {
                self.single_quote(out);
                "&#39;".len()
            } else if rest.starts_with("&#x27;") {
                self.single_quote(out);
                "&#x27;".len()
            } else if c == '&' {
                // Any other entity is copied whole and reads like a letter.
                let end = rest
                    .char_indices()
                    .take(12)
                    .find(|(_, c)| *c == ';')
                    .map_or(1, |(i, _)| i + 1);
                self.emit(out, &rest[..end], 'x');
                end
            } else if c == '"' {
                self.double_quote(out);
                1
            } else if c == '\'' {
                self.single_quote(out);
                1
            } else {
                out.push(c);
                self.prev = Some(c);
                c.len_utf8()
            };
            rest = &rest[consumed..];
        }
    }

    fn emit(&mut self, out: &mut String, s: &str, reads_as: char) {
        out.push_str(s);
        self.prev = Some(reads_as);
    }

    /// A quote opens at the start of the text, after whitespace, or after
    /// opening punctuation; otherwise it closes.
    fn opens(&self) -> bool {
        match self.prev {
            None => true,
            Some(c) => c.is_whitespace() || "([{—–-“‘".contains(c),
        }
    }

    fn double_quote(&mut self, out: &mut String) {
        if self.opens() {
            self.emit(out, LEFT_DOUBLE, '“');
        } else {
            self.emit(out, RIGHT_DOUBLE, '”');
        }
    }

    fn single_quote(&mut self, out: &mut String) {
        if self.opens() {
            self.emit(out, LEFT_SINGLE, '‘');
        } else {
            self.emit(out, RIGHT_SINGLE, '’');
        }
    }
}
