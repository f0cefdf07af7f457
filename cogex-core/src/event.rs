use std::sync::Arc;

use crate::stimulus::EventType;

/// What the presentation backend is asked to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StimulusRef<'a, H> {
    /// A preloaded catalog entry
    Asset(&'a H),
    FixationCross,
    Blank,
}

/// Presentation payload of an atomic event, one variant per event type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload<H> {
    Sound { id: Arc<str>, handle: H },
    Picture { id: Arc<str>, handle: H },
    Video { id: Arc<str>, handle: H },
    Text { id: Arc<str>, handle: H },
    Blank,
    Fs,
}

impl<H> EventPayload<H> {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::Sound { .. } => EventType::Sound,
            EventPayload::Picture { .. } => EventType::Picture,
            EventPayload::Video { .. } => EventType::Video,
            EventPayload::Text { .. } => EventType::Text,
            EventPayload::Blank => EventType::Blank,
            EventPayload::Fs => EventType::Fs,
        }
    }

    /// Identifier written to the log: the file name or word, or the
    /// literal `blank` / `fs` for the built-in screens
    pub fn id(&self) -> &str {
        match self {
            EventPayload::Sound { id, .. }
            | EventPayload::Picture { id, .. }
            | EventPayload::Video { id, .. }
            | EventPayload::Text { id, .. } => id,
            EventPayload::Blank => "blank",
            EventPayload::Fs => "fs",
        }
    }

    pub fn stimulus(&self) -> StimulusRef<'_, H> {
        match self {
            EventPayload::Sound { handle, .. }
            | EventPayload::Picture { handle, .. }
            | EventPayload::Video { handle, .. }
            | EventPayload::Text { handle, .. } => StimulusRef::Asset(handle),
            EventPayload::Blank => StimulusRef::Blank,
            EventPayload::Fs => StimulusRef::FixationCross,
        }
    }
}

/// A single presentation at an absolute onset (ms from the trigger)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicEvent<H> {
    pub onset_ms: u64,
    pub condition: Arc<str>,
    pub payload: EventPayload<H>,
}

impl<H> AtomicEvent<H> {
    pub fn new(onset_ms: u64, condition: Arc<str>, payload: EventPayload<H>) -> Self {
        Self {
            onset_ms,
            condition,
            payload,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    pub fn id(&self) -> &str {
        self.payload.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_screens_have_fixed_ids() {
        let blank: EventPayload<u8> = EventPayload::Blank;
        let fs: EventPayload<u8> = EventPayload::Fs;
        assert_eq!(blank.id(), "blank");
        assert_eq!(fs.id(), "fs");
        assert_eq!(blank.stimulus(), StimulusRef::Blank);
        assert_eq!(fs.stimulus(), StimulusRef::FixationCross);
    }

    #[test]
    fn asset_payload_exposes_its_handle() {
        let payload = EventPayload::Picture {
            id: Arc::from("face1.png"),
            handle: 7u8,
        };
        assert_eq!(payload.event_type(), EventType::Picture);
        assert_eq!(payload.id(), "face1.png");
        assert_eq!(payload.stimulus(), StimulusRef::Asset(&7));
    }
}
