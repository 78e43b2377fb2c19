/// One callback of the XML tokenizer, as a value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseEvent {
    OpenTag {
        name: String,
        attributes: Vec<(String, String)>,
    },
    CloseTag {
        name: String,
    },
    Text(String),
    End,
    Error(String),
}

impl ParseEvent {
    pub fn open(name: impl Into<String>) -> Self {
        ParseEvent::OpenTag {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn close(name: impl Into<String>) -> Self {
        ParseEvent::CloseTag { name: name.into() }
    }

    pub fn text(chars: impl Into<String>) -> Self {
        ParseEvent::Text(chars.into())
    }
}

/// Consumer of tokenizer events.
pub trait EventSink {
    fn handle_event(&mut self, event: ParseEvent);
}

impl EventSink for Vec<ParseEvent> {
    fn handle_event(&mut self, event: ParseEvent) {
        self.push(event);
    }
}

/// Tag name without its namespace prefix (`gml:posList` -> `posList`).
pub fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}
