//! Detection of the `🔍 SEARCH: "query"` request in streamed model output.
//!
//! Text is released as soon as it cannot belong to a search request. Only a
//! trailing fragment that could still grow into one is held back.

pub const SEARCH_MARKER: &str = "🔍 SEARCH:";

const MAX_QUERY_CHARS: usize = 256;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanOutput {
    /// Text safe to send to the client now.
    pub forward: String,
    /// Set once a complete search request has been read.
    pub query: Option<String>,
}

#[derive(Debug, Default)]
pub struct SentinelScanner {
    held: String,
    capturing: bool,
}

enum QueryParse {
    Complete(String),
    Incomplete,
    Invalid,
}

impl SentinelScanner {
    pub fn push(&mut self, fragment: &str) -> ScanOutput {
        self.held.push_str(fragment);
        let mut out = ScanOutput::default();

        loop {
            if !self.capturing {
                match self.held.find(SEARCH_MARKER) {
                    Some(pos) => {
                        out.forward.push_str(&self.held[..pos]);
                        self.held.drain(..pos);
                        self.capturing = true;
                    }
                    None => {
                        let split = self.held.len() - partial_marker_len(&self.held);
                        out.forward.push_str(&self.held[..split]);
                        self.held.drain(..split);
                        return out;
                    }
                }
            }

            match parse_query(&self.held[SEARCH_MARKER.len()..]) {
                QueryParse::Complete(query) => {
                    self.held.clear();
                    self.capturing = false;
                    out.query = Some(query);
                    return out;
                }
                QueryParse::Incomplete => return out,
                QueryParse::Invalid => {
                    out.forward.push_str(SEARCH_MARKER);
                    self.held.drain(..SEARCH_MARKER.len());
                    self.capturing = false;
                }
            }
        }
    }

    /// Releases everything still held once the stream has ended.
    pub fn finish(&mut self) -> String {
        self.capturing = false;
        std::mem::take(&mut self.held)
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of the marker.
fn partial_marker_len(text: &str) -> usize {
    let longest = (SEARCH_MARKER.len() - 1).min(text.len());
    (1..=longest)
        .rev()
        .find(|&n| {
            let start = text.len() - n;
            text.is_char_boundary(start) && SEARCH_MARKER.starts_with(&text[start..])
        })
        .unwrap_or(0)
}

fn parse_query(rest: &str) -> QueryParse {
    let trimmed = rest.trim_start_matches([' ', '\t']);
    if trimmed.is_empty() {
        return if rest.len() > MAX_QUERY_CHARS {
            QueryParse::Invalid
        } else {
            QueryParse::Incomplete
        };
    }

    let Some(body) = trimmed.strip_prefix(['"', '“']) else {
        return QueryParse::Invalid;
    };

    match body.find(['"', '”', '\n']) {
        Some(end) if !body[end..].starts_with('\n') => {
            let query = body[..end].trim();
            if query.is_empty() {
                QueryParse::Invalid
            } else {
                QueryParse::Complete(query.to_string())
            }
        }
        Some(_) => QueryParse::Invalid,
        None if body.chars().count() > MAX_QUERY_CHARS => QueryParse::Invalid,
        None => QueryParse::Incomplete,
    }
}
