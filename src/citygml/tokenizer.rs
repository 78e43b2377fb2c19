//! Push-style adapter over quick-xml.
//!
//! quick-xml pulls from a complete buffer, while documents arrive here in
//! arbitrary byte chunks. `XmlTokenizer` keeps the bytes of the chunk that
//! cannot be tokenized yet (an unterminated markup, a dangling entity, a split
//! UTF-8 sequence) and hands only the complete prefix to quick-xml. Text split
//! across chunks comes out as several `Text` events; consumers concatenate.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::citygml::event::{EventSink, ParseEvent};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct XmlTokenizer {
    pending: Vec<u8>,
    consumed: u64,
    depth: usize,
    closed: bool,
}

impl XmlTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes held back for the next chunk.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn write(&mut self, chunk: &[u8], sink: &mut impl EventSink) -> Result<()> {
        if self.closed {
            return Err(Error::StreamClosed);
        }

        self.pending.extend_from_slice(chunk);
        let complete = complete_prefix_len(&self.pending);
        if complete == 0 {
            return Ok(());
        }

        let fragment: Vec<u8> = self.pending.drain(..complete).collect();
        self.feed(&fragment, sink)
    }

    /// Flushes what is left and emits `End`.
    pub fn close(&mut self, sink: &mut impl EventSink) -> Result<()> {
        if self.closed {
            return Err(Error::StreamClosed);
        }

        let rest = std::mem::take(&mut self.pending);
        let complete = complete_prefix_len(&rest);
        self.feed(&rest[..complete], sink)?;

        let tail = &rest[complete..];
        if tail.contains(&b'<') {
            return Err(self.fail("unexpected end of document inside markup".into(), sink));
        }
        if !tail.is_empty() {
            sink.handle_event(ParseEvent::Text(String::from_utf8_lossy(tail).into_owned()));
        }
        if self.depth > 0 {
            let message = format!(
                "unexpected end of document: {} unclosed element(s)",
                self.depth
            );
            return Err(self.fail(message, sink));
        }

        self.closed = true;
        sink.handle_event(ParseEvent::End);
        Ok(())
    }

    fn feed(&mut self, fragment: &[u8], sink: &mut impl EventSink) -> Result<()> {
        let offset = self.consumed;
        self.consumed += fragment.len() as u64;

        match self.tokenize(fragment, sink) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(format!("{} (in chunk at byte {})", e, offset), sink)),
        }
    }

    fn fail(&mut self, message: String, sink: &mut impl EventSink) -> Error {
        log::error!("XML tokenizer: {}", message);
        self.closed = true;
        self.pending.clear();
        sink.handle_event(ParseEvent::Error(message.clone()));
        Error::Xml(message)
    }

    fn tokenize(
        &mut self,
        fragment: &[u8],
        sink: &mut impl EventSink,
    ) -> std::result::Result<(), String> {
        let mut reader = Reader::from_reader(fragment);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    sink.handle_event(open_tag(&e)?);
                    self.depth += 1;
                }
                Ok(Event::Empty(e)) => {
                    sink.handle_event(open_tag(&e)?);
                    sink.handle_event(ParseEvent::close(lossy(e.name().as_ref())));
                }
                Ok(Event::End(e)) => {
                    sink.handle_event(ParseEvent::close(lossy(e.name().as_ref())));
                    self.depth = self.depth.saturating_sub(1);
                }
                Ok(Event::Text(e)) => {
                    let text = match e.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(err) => {
                            log::warn!("Keeping raw text after unescape failure: {}", err);
                            lossy(&e)
                        }
                    };
                    if !text.is_empty() {
                        sink.handle_event(ParseEvent::Text(text));
                    }
                }
                Ok(Event::CData(e)) => {
                    sink.handle_event(ParseEvent::Text(lossy(&e)));
                }
                Ok(Event::Eof) => return Ok(()),
                // declarations, comments, processing instructions, doctype
                Ok(_) => {}
                Err(e) => return Err(e.to_string()),
            }
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn open_tag(e: &BytesStart<'_>) -> std::result::Result<ParseEvent, String> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => lossy(&attr.value),
        };
        attributes.push((lossy(attr.key.as_ref()), value));
    }
    Ok(ParseEvent::OpenTag {
        name: lossy(e.name().as_ref()),
        attributes,
    })
}

/// Length of the longest prefix of `buf` that can be tokenized on its own.
fn complete_prefix_len(buf: &[u8]) -> usize {
    let mut pos = 0;
    let text_start = loop {
        let Some(lt) = buf[pos..].iter().position(|&b| b == b'<') else {
            break pos;
        };
        let lt = pos + lt;
        match markup_len(&buf[lt..]) {
            Some(len) => pos = lt + len,
            None => return trim_text_tail(buf, pos, lt),
        }
    };
    trim_text_tail(buf, text_start, buf.len())
}

/// Moves `end` back so `buf[start..end]` ends neither inside an entity
/// reference nor inside a UTF-8 sequence.
fn trim_text_tail(buf: &[u8], start: usize, end: usize) -> usize {
    let text = &buf[start..end];

    let mut end = match text.iter().rposition(|&b| b == b'&') {
        Some(amp) if !text[amp..].contains(&b';') => start + amp,
        _ => end,
    };

    // incomplete UTF-8 sequence at the tail
    let tail_start = end.saturating_sub(3).max(start);
    if let Some(lead) = buf[tail_start..end]
        .iter()
        .rposition(|&b| b & 0xC0 != 0x80)
    {
        let lead = tail_start + lead;
        let expected = match buf[lead] {
            b if b >= 0xF0 => 4,
            b if b >= 0xE0 => 3,
            b if b >= 0xC0 => 2,
            _ => 1,
        };
        if end - lead < expected {
            end = lead;
        }
    }

    end
}

/// Length of the markup at the start of `m` (which begins with `<`), or
/// `None` when it is not terminated yet.
fn markup_len(m: &[u8]) -> Option<usize> {
    const COMMENT: &[u8] = b"<!--";
    const CDATA: &[u8] = b"<![CDATA[";

    if m.len() < CDATA.len() && (CDATA.starts_with(m) || COMMENT.starts_with(m)) {
        return None;
    }

    if m.starts_with(COMMENT) {
        return find(&m[COMMENT.len()..], b"-->").map(|i| COMMENT.len() + i + 3);
    }
    if m.starts_with(CDATA) {
        return find(&m[CDATA.len()..], b"]]>").map(|i| CDATA.len() + i + 3);
    }
    if m.starts_with(b"<?") {
        return find(&m[2..], b"?>").map(|i| 2 + i + 2);
    }
    if m.starts_with(b"<!") {
        // doctype, possibly with an internal subset in brackets
        let mut depth = 0usize;
        for (i, &b) in m.iter().enumerate() {
            match b {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => return Some(i + 1),
                _ => {}
            }
        }
        return None;
    }

    // element tag; '>' inside a quoted attribute value does not end it
    let mut quote = None;
    for (i, &b) in m.iter().enumerate().skip(1) {
        match (quote, b) {
            (None, b'"' | b'\'') => quote = Some(b),
            (Some(q), _) if b == q => quote = None,
            (None, b'>') => return Some(i + 1),
            _ => {}
        }
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
