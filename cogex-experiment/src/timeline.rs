//! Expansion of script rows into absolutely timed atomic events.
//!
//! Runs once before the trigger so every asset is loaded before the clock
//! starts. Sequence rows (`rsvp`, `pictseq`) become one event per item plus
//! clearing blanks and a closing fixation cross.

use std::path::Path;
use std::sync::Arc;

use cogex_cache::StimulusCatalog;
use cogex_core::{
    AssetKind, AssetRequest, AtomicEvent, EventPayload, ScriptRow, StimulusLoader, StimulusType,
};
use tracing::debug;

use crate::config::TimingConfig;
use crate::error::{SetupError, SetupResult};
use crate::queue::EventQueue;

pub struct TimelineCompiler<'a, L: StimulusLoader> {
    timing: &'a TimingConfig,
    /// Directory file payloads are resolved against (the script's own)
    base_dir: &'a Path,
    catalog: &'a mut StimulusCatalog<L::Handle>,
    loader: &'a mut L,
}

impl<'a, L: StimulusLoader> TimelineCompiler<'a, L> {
    pub fn new(
        timing: &'a TimingConfig,
        base_dir: &'a Path,
        catalog: &'a mut StimulusCatalog<L::Handle>,
        loader: &'a mut L,
    ) -> Self {
        Self {
            timing,
            base_dir,
            catalog,
            loader,
        }
    }

    pub fn compile(&mut self, rows: &[ScriptRow]) -> SetupResult<EventQueue<L::Handle>> {
        let mut queue = EventQueue::new();
        for row in rows {
            queue.extend(self.expand_row(row)?);
        }
        debug!(
            rows = rows.len(),
            events = queue.len(),
            stimuli = self.catalog.len(),
            "compiled timeline"
        );
        Ok(queue)
    }

    /// Events for one row, in generation order
    pub fn expand_row(&mut self, row: &ScriptRow) -> SetupResult<Vec<AtomicEvent<L::Handle>>> {
        let t = self.timing;
        let condition = &row.condition;
        let onset = row.onset_ms;

        let events = match row.stimulus_type {
            StimulusType::Sound => {
                let (id, handle) = self.resolve(row, AssetKind::Sound, &row.payload)?;
                vec![AtomicEvent::new(onset, condition.clone(), EventPayload::Sound { id, handle })]
            }
            StimulusType::Picture => {
                let (id, handle) = self.resolve(row, AssetKind::Picture, &row.payload)?;
                vec![
                    AtomicEvent::new(onset, condition.clone(), EventPayload::Picture { id, handle }),
                    AtomicEvent::new(
                        after(row, onset, t.picture_duration_ms)?,
                        condition.clone(),
                        EventPayload::Blank,
                    ),
                ]
            }
            StimulusType::Video => {
                let (id, handle) = self.resolve(row, AssetKind::Video, &row.payload)?;
                vec![AtomicEvent::new(onset, condition.clone(), EventPayload::Video { id, handle })]
            }
            StimulusType::Text => {
                let (id, handle) = self.resolve(row, AssetKind::Text, &row.payload)?;
                vec![
                    AtomicEvent::new(onset, condition.clone(), EventPayload::Text { id, handle }),
                    AtomicEvent::new(
                        after(row, onset, t.text_duration_ms)?,
                        condition.clone(),
                        EventPayload::Fs,
                    ),
                ]
            }
            StimulusType::Rsvp => {
                self.expand_sequence(row, AssetKind::Text, t.word_duration_ms, t.word_isi_ms)?
            }
            StimulusType::PictSeq => self.expand_sequence(
                row,
                AssetKind::Picture,
                t.picture_duration_ms,
                t.picture_isi_ms,
            )?,
        };
        Ok(events)
    }

    fn expand_sequence(
        &mut self,
        row: &ScriptRow,
        kind: AssetKind,
        duration_ms: u64,
        isi_ms: u64,
    ) -> SetupResult<Vec<AtomicEvent<L::Handle>>> {
        let items = row.items();
        let step = duration_ms.saturating_add(isi_ms);
        let mut events = Vec::with_capacity(items.len() * 2 + 2);

        let mut last_onset = row.onset_ms;
        for (i, item) in items.iter().enumerate() {
            let offset = (i as u64).checked_mul(step).unwrap_or(u64::MAX);
            let onset = after(row, row.onset_ms, offset)?;
            let (id, handle) = self.resolve(row, kind, item)?;
            let payload = match kind {
                AssetKind::Picture => EventPayload::Picture { id, handle },
                _ => EventPayload::Text { id, handle },
            };
            events.push(AtomicEvent::new(onset, row.condition.clone(), payload));
            if isi_ms != 0 {
                events.push(AtomicEvent::new(
                    after(row, onset, duration_ms)?,
                    row.condition.clone(),
                    EventPayload::Blank,
                ));
            }
            last_onset = onset;
        }

        // back-to-back items: only the last one needs clearing
        if isi_ms == 0 {
            events.push(AtomicEvent::new(
                after(row, last_onset, duration_ms)?,
                row.condition.clone(),
                EventPayload::Blank,
            ));
        }
        let fs_offset = duration_ms.saturating_add(self.timing.fs_delay_ms);
        events.push(AtomicEvent::new(
            after(row, last_onset, fs_offset)?,
            row.condition.clone(),
            EventPayload::Fs,
        ));
        Ok(events)
    }

    fn resolve(&mut self, row: &ScriptRow, kind: AssetKind, item: &str) -> SetupResult<(Arc<str>, L::Handle)> {
        let key = if kind.is_file() {
            self.base_dir.join(item).to_string_lossy().into_owned()
        } else {
            item.to_string()
        };
        let handle = self
            .catalog
            .resolve_and_load(self.loader, &AssetRequest::new(kind, key))
            .map_err(|source| SetupError::Stimulus {
                line: row.line,
                source,
            })?;
        Ok((Arc::from(item), handle))
    }
}

/// `onset + offset_ms`, or a setup error naming the row when it does not fit
fn after(row: &ScriptRow, onset_ms: u64, offset_ms: u64) -> SetupResult<u64> {
    onset_ms
        .checked_add(offset_ms)
        .ok_or(SetupError::OnsetOverflow {
            line: row.line,
            onset_ms,
            offset_ms,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogex_core::{EventType, LoadError};

    #[derive(Default)]
    struct KeyLoader {
        loads: usize,
    }

    impl StimulusLoader for KeyLoader {
        type Handle = String;

        fn load(&mut self, request: &AssetRequest) -> Result<String, LoadError> {
            if request.key.contains("missing") {
                return Err(LoadError::NotFound(request.key.clone().into()));
            }
            self.loads += 1;
            Ok(request.key.clone())
        }
    }

    fn expand(timing: &TimingConfig, row: ScriptRow) -> Vec<(u64, EventType, String)> {
        let mut catalog = StimulusCatalog::new();
        let mut loader = KeyLoader::default();
        let mut compiler = TimelineCompiler::new(timing, Path::new("stim"), &mut catalog, &mut loader);
        let mut queue: EventQueue<String> = compiler.expand_row(&row).unwrap().into_iter().collect();
        queue
            .drain_ordered()
            .map(|e| (e.onset_ms, e.event_type(), e.id().to_string()))
            .collect()
    }

    fn timing(word_duration: u64, word_isi: u64, fs_delay: u64) -> TimingConfig {
        TimingConfig {
            word_duration_ms: word_duration,
            word_isi_ms: word_isi,
            fs_delay_ms: fs_delay,
            ..TimingConfig::default()
        }
    }

    #[test]
    fn rsvp_without_isi_has_single_trailing_blank() {
        let row = ScriptRow::new(1, "A", 1000, StimulusType::Rsvp, "cat,dog,bird");
        let events = expand(&timing(450, 0, 100), row);
        assert_eq!(
            events,
            vec![
                (1000, EventType::Text, "cat".into()),
                (1450, EventType::Text, "dog".into()),
                (1900, EventType::Text, "bird".into()),
                (2350, EventType::Blank, "blank".into()),
                (2450, EventType::Fs, "fs".into()),
            ]
        );
    }

    #[test]
    fn rsvp_with_isi_alternates_words_and_blanks() {
        let row = ScriptRow::new(1, "A", 0, StimulusType::Rsvp, "un,deux,trois,quatre");
        let events = expand(&timing(250, 100, 100), row);
        let kinds: Vec<EventType> = events.iter().map(|e| e.1).collect();
        assert_eq!(
            kinds,
            vec![
                EventType::Text,
                EventType::Blank,
                EventType::Text,
                EventType::Blank,
                EventType::Text,
                EventType::Blank,
                EventType::Text,
                EventType::Blank,
                EventType::Fs,
            ]
        );
        assert_eq!(events[2].0, 350);
        assert_eq!(events[7].0, 3 * 350 + 250);
        assert_eq!(events[8].0, 3 * 350 + 250 + 100);
    }

    #[test]
    fn single_word_rsvp_still_gets_trailing_blank() {
        let row = ScriptRow::new(1, "A", 200, StimulusType::Rsvp, "seul");
        let events = expand(&timing(450, 0, 100), row);
        assert_eq!(
            events,
            vec![
                (200, EventType::Text, "seul".into()),
                (650, EventType::Blank, "blank".into()),
                (750, EventType::Fs, "fs".into()),
            ]
        );
    }

    #[test]
    fn picture_gets_blank_after_display_time() {
        let timing = TimingConfig {
            picture_duration_ms: 200,
            ..TimingConfig::default()
        };
        let row = ScriptRow::new(1, "B", 500, StimulusType::Picture, "face1.png");
        let events = expand(&timing, row);
        assert_eq!(
            events,
            vec![
                (500, EventType::Picture, "face1.png".into()),
                (700, EventType::Blank, "blank".into()),
            ]
        );
    }

    #[test]
    fn text_is_followed_by_fixation_and_sound_video_stand_alone() {
        let timing = TimingConfig::default();
        let text = expand(&timing, ScriptRow::new(1, "T", 0, StimulusType::Text, "Bonjour"));
        assert_eq!(text[1], (3000, EventType::Fs, "fs".into()));

        let sound = expand(&timing, ScriptRow::new(2, "S", 40, StimulusType::Sound, "bip.wav"));
        assert_eq!(sound, vec![(40, EventType::Sound, "bip.wav".into())]);

        let video = expand(&timing, ScriptRow::new(3, "V", 40, StimulusType::Video, "clip.mp4"));
        assert_eq!(video, vec![(40, EventType::Video, "clip.mp4".into())]);
    }

    #[test]
    fn pictseq_uses_picture_timings() {
        let timing = TimingConfig {
            picture_duration_ms: 200,
            picture_isi_ms: 0,
            fs_delay_ms: 100,
            ..TimingConfig::default()
        };
        let row = ScriptRow::new(1, "P", 0, StimulusType::PictSeq, "a.png,b.png");
        let events = expand(&timing, row);
        assert_eq!(
            events,
            vec![
                (0, EventType::Picture, "a.png".into()),
                (200, EventType::Picture, "b.png".into()),
                (400, EventType::Blank, "blank".into()),
                (500, EventType::Fs, "fs".into()),
            ]
        );
    }

    #[test]
    fn files_resolve_against_base_dir_and_load_once() {
        let timing = TimingConfig::default();
        let rows = vec![
            ScriptRow::new(1, "A", 0, StimulusType::Picture, "face.png"),
            ScriptRow::new(2, "A", 2000, StimulusType::PictSeq, "face.png,house.png,face.png"),
            ScriptRow::new(3, "B", 9000, StimulusType::Rsvp, "face.png"),
        ];
        let mut catalog = StimulusCatalog::new();
        let mut loader = KeyLoader::default();
        let queue = TimelineCompiler::new(&timing, Path::new("stim"), &mut catalog, &mut loader)
            .compile(&rows)
            .unwrap();
        assert_eq!(loader.loads, 3);
        let face = Path::new("stim").join("face.png");
        assert!(catalog.contains(AssetKind::Picture, &face.to_string_lossy()));
        assert!(catalog.contains(AssetKind::Text, "face.png"));
        // picture+blank, three pictures+blank+fs, word+blank+fs
        assert_eq!(queue.len(), 2 + 5 + 3);
    }

    #[test]
    fn onsets_past_the_clock_range_are_rejected() {
        let timing = TimingConfig::default();
        let mut catalog = StimulusCatalog::new();
        let mut loader = KeyLoader::default();
        let mut compiler = TimelineCompiler::new(&timing, Path::new("stim"), &mut catalog, &mut loader);

        let huge = u64::MAX - 600;
        let picture = ScriptRow::new(4, "B", huge, StimulusType::Picture, "face.png");
        assert!(matches!(
            compiler.expand_row(&picture),
            Err(SetupError::OnsetOverflow { line: 4, offset_ms: 1000, .. })
        ));

        let words = ScriptRow::new(9, "A", huge, StimulusType::Rsvp, "un,deux");
        assert!(matches!(
            compiler.expand_row(&words),
            Err(SetupError::OnsetOverflow { line: 9, .. })
        ));

        // the last representable onset still compiles when nothing follows it
        let sound = ScriptRow::new(5, "S", u64::MAX, StimulusType::Sound, "bip.wav");
        assert_eq!(compiler.expand_row(&sound).unwrap().len(), 1);
    }

    #[test]
    fn load_failure_names_the_row() {
        let timing = TimingConfig::default();
        let rows = vec![
            ScriptRow::new(1, "A", 0, StimulusType::Text, "ok"),
            ScriptRow::new(7, "A", 10, StimulusType::Sound, "missing.wav"),
        ];
        let mut catalog = StimulusCatalog::new();
        let mut loader = KeyLoader::default();
        let err = TimelineCompiler::new(&timing, Path::new("."), &mut catalog, &mut loader)
            .compile(&rows)
            .err()
            .unwrap();
        assert!(matches!(err, SetupError::Stimulus { line: 7, .. }));
    }
}
