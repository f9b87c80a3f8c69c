use assist_core::{text_range, TextRange};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyEntry {
    /// Unescaped key.
    pub key: String,
    /// Unescaped value, continuation lines joined.
    pub value: String,
    pub key_range: TextRange,
    pub value_range: TextRange,
}

/// Which half of an entry an offset falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryPart {
    Key,
    Value,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertiesFile {
    pub entries: Vec<PropertyEntry>,
}

impl PropertiesFile {
    pub fn by_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a PropertyEntry> + 'a {
        self.entries.iter().filter(move |entry| entry.key == key)
    }

    /// The entry whose key or value contains `offset`. Both ends are
    /// inclusive so a cursor right after the key still counts.
    pub fn entry_at(&self, offset: usize) -> Option<(&PropertyEntry, EntryPart)> {
        let contains = |range: TextRange| {
            usize::from(range.start()) <= offset && offset <= usize::from(range.end())
        };
        self.entries.iter().find_map(|entry| {
            if contains(entry.key_range) {
                Some((entry, EntryPart::Key))
            } else if contains(entry.value_range) {
                Some((entry, EntryPart::Value))
            } else {
                None
            }
        })
    }
}

/// One logical line: physical lines joined at trailing backslashes.
struct LogicalLine {
    chars: Vec<char>,
    /// `chars[i]` starts at byte `offsets[i]` of the input.
    offsets: Vec<usize>,
    /// Byte offset just past the last copied char.
    end: usize,
}

impl LogicalLine {
    /// Byte offset in the input of logical position `idx`, which may be one
    /// past the last char.
    fn byte_offset(&self, idx: usize) -> usize {
        self.offsets.get(idx).copied().unwrap_or(self.end)
    }

    fn range(&self, start: usize, end: usize) -> TextRange {
        let start_byte = self.byte_offset(start);
        if start >= end {
            return text_range(start_byte, start_byte);
        }
        let last = end - 1;
        text_range(start_byte, self.offsets[last] + self.chars[last].len_utf8())
    }
}

/// Parse `.properties` text into entries, keeping the source range of every
/// key and value.
pub fn parse(text: &str) -> PropertiesFile {
    let mut offset = 0;
    let mut entries = Vec::new();
    while offset < text.len() {
        let line = read_logical_line(text, &mut offset);
        if let Some(entry) = parse_logical_line(&line) {
            entries.push(entry);
        }
    }
    PropertiesFile { entries }
}

fn read_logical_line(text: &str, offset: &mut usize) -> LogicalLine {
    let mut chars = Vec::new();
    let mut offsets = Vec::new();
    let mut end;
    let mut first = true;

    loop {
        let start = *offset;
        let line_end = text[start..].find('\n').map_or(text.len(), |i| start + i);
        let content = text[start..line_end].strip_suffix('\r').unwrap_or(&text[start..line_end]);
        *offset = (line_end + 1).min(text.len());

        // Comment lines never continue.
        let is_comment = first && content.trim_start_matches(is_blank).starts_with(['#', '!']);
        let continues = !is_comment && ends_with_unescaped_backslash(content);
        let copied = if continues { &content[..content.len() - 1] } else { content };

        for (i, c) in copied.char_indices() {
            chars.push(c);
            offsets.push(start + i);
        }
        end = start + copied.len();
        first = false;

        if !continues || *offset >= text.len() {
            break;
        }
        while let Some(c) = text[*offset..].chars().next().filter(|&c| is_blank(c)) {
            *offset += c.len_utf8();
        }
    }

    LogicalLine { chars, offsets, end }
}

fn ends_with_unescaped_backslash(line: &str) -> bool {
    line.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

fn parse_logical_line(line: &LogicalLine) -> Option<PropertyEntry> {
    let chars = &line.chars;
    let skip_blanks = |mut i: usize| {
        while i < chars.len() && is_blank(chars[i]) {
            i += 1;
        }
        i
    };

    let key_start = skip_blanks(0);
    match chars.get(key_start) {
        None | Some('#') | Some('!') => return None,
        Some(_) => {}
    }

    let mut i = key_start;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '=' | ':' => break,
            c if is_blank(c) => break,
            _ => i += 1,
        }
    }
    let key_end = i.min(chars.len());

    i = skip_blanks(key_end);
    if matches!(chars.get(i), Some('=') | Some(':')) {
        i += 1;
    }
    let value_start = skip_blanks(i);
    let value_end = chars.len();

    Some(PropertyEntry {
        key: unescape(&chars[key_start..key_end]),
        value: unescape(&chars[value_start..value_end]),
        key_range: line.range(key_start, key_end),
        value_range: line.range(value_start, value_end),
    })
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0C')
}

fn unescape(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    let mut iter = chars.iter().copied().peekable();
    while let Some(c) = iter.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match iter.next() {
            None => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0C'),
            Some('u') => {
                let digits: String = chars_ahead(&mut iter, 4);
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if digits.len() == 4 => out.push(decoded),
                    _ => {
                        out.push('u');
                        out.push_str(&digits);
                    }
                }
            }
            Some(other) => out.push(other),
        }
    }
    out
}

fn chars_ahead(iter: &mut std::iter::Peekable<impl Iterator<Item = char>>, n: usize) -> String {
    let mut out = String::with_capacity(n);
    while out.len() < n {
        match iter.next_if(char::is_ascii_hexdigit) {
            Some(c) => out.push(c),
            None => break,
        }
    }
    out
}
