use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Ids double as file and directory names, so only `[A-Za-z0-9_-]` is accepted.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let valid = !value.is_empty()
            && value
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !valid {
            return Err(DomainError::InvalidSessionId(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CaptureId(u32);

impl CaptureId {
    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::InvalidCaptureId(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    fn from_position(index: usize) -> Self {
        Self(index as u32 + 1)
    }
}

impl Display for CaptureId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for CaptureId {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CaptureId> for u32 {
    fn from(value: CaptureId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub id: CaptureId,
    pub time: String,
    pub description: String,
    pub image_path: String,
}

pub fn default_capture_description(id: CaptureId) -> String {
    format!("record {id}")
}

/// One recording run. Fields are private so that the name and the capture
/// numbering can only change through methods that keep them valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    name: String,
    description: String,
    start_time: String,
    end_time: String,
    duration: u64,
    captures: Vec<Capture>,
}

impl Session {
    pub fn new(
        id: SessionId,
        name: &str,
        description: &str,
        start_time: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id,
            name: normalize_name(name)?,
            description: description.trim().to_string(),
            start_time: start_time.into(),
            end_time: String::new(),
            duration: 0,
            captures: Vec::new(),
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start_time(&self) -> &str {
        &self.start_time
    }

    pub fn end_time(&self) -> &str {
        &self.end_time
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration
    }

    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    pub fn capture(&self, id: CaptureId) -> Option<&Capture> {
        self.captures.iter().find(|capture| capture.id == id)
    }

    pub fn is_active(&self) -> bool {
        self.end_time.is_empty()
    }

    pub fn rename(&mut self, name: &str) -> Result<(), DomainError> {
        self.name = normalize_name(name)?;
        Ok(())
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.trim().to_string();
    }

    /// Stamps the end of the session. The duration is stored as given and is
    /// not recomputed by later edits.
    pub fn finish(&mut self, end_time: impl Into<String>, duration_secs: u64) {
        self.end_time = end_time.into();
        self.duration = duration_secs;
    }

    pub fn next_capture_id(&self) -> CaptureId {
        CaptureId::from_position(self.captures.len())
    }

    pub fn append_capture(
        &mut self,
        time: impl Into<String>,
        description: &str,
        image_path: impl Into<String>,
    ) -> &Capture {
        let id = self.next_capture_id();
        let description = match description.trim() {
            "" => default_capture_description(id),
            text => text.to_string(),
        };
        self.captures.push(Capture {
            id,
            time: time.into(),
            description,
            image_path: image_path.into(),
        });
        &self.captures[self.captures.len() - 1]
    }

    pub fn set_capture_description(
        &mut self,
        id: CaptureId,
        description: &str,
    ) -> Result<(), DomainError> {
        let capture = self
            .captures
            .iter_mut()
            .find(|capture| capture.id == id)
            .ok_or(DomainError::CaptureNotFound(id.get()))?;
        capture.description = description.trim().to_string();
        Ok(())
    }

    /// Removes a capture and renumbers the ones after it.
    pub fn remove_capture(&mut self, id: CaptureId) -> Result<Capture, DomainError> {
        let index = self
            .captures
            .iter()
            .position(|capture| capture.id == id)
            .ok_or(DomainError::CaptureNotFound(id.get()))?;
        let removed = self.captures.remove(index);
        for (position, capture) in self.captures.iter_mut().enumerate().skip(index) {
            capture.id = CaptureId::from_position(position);
        }
        Ok(removed)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::EmptySessionName);
        }
        for (position, capture) in self.captures.iter().enumerate() {
            if capture.id != CaptureId::from_position(position) {
                return Err(DomainError::CaptureIdsNotContiguous {
                    position,
                    found: capture.id.get(),
                });
            }
        }
        Ok(())
    }
}

fn normalize_name(name: &str) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::EmptySessionName);
    }
    Ok(trimmed.to_string())
}

pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h{minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m{secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn session() -> Session {
        Session::new(
            SessionId::new("s-1").expect("id"),
            "Demo",
            "",
            "2026-10-16 09:00:00",
        )
        .expect("session")
    }

    fn ids(session: &Session) -> Vec<u32> {
        session.captures().iter().map(|c| c.id.get()).collect()
    }

    #[test]
    fn session_id_rejects_path_like_values() {
        assert!(SessionId::new("3f2a-11_b").is_ok());
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("../etc").is_err());
        assert!(SessionId::new("a/b").is_err());
    }

    #[test]
    fn name_is_trimmed_and_required() {
        let id = SessionId::new("s").expect("id");
        assert!(matches!(
            Session::new(id.clone(), "   ", "", "t"),
            Err(DomainError::EmptySessionName)
        ));
        let session = Session::new(id, "  Demo ", "", "t").expect("session");
        assert_eq!(session.name(), "Demo");
        assert!(session.is_active());
    }

    #[test]
    fn append_assigns_sequential_ids_and_placeholder_description() {
        let mut session = session();
        session.append_capture("t1", "", "a.png");
        session.append_capture("t2", "login page", "b.png");
        assert_eq!(ids(&session), vec![1, 2]);
        assert_eq!(session.captures()[0].description, "record 1");
        assert_eq!(session.captures()[1].description, "login page");
    }

    #[test]
    fn remove_renumbers_following_captures() {
        let mut session = session();
        for name in ["a.png", "b.png", "c.png"] {
            session.append_capture("t", "", name);
        }
        let removed = session
            .remove_capture(CaptureId::new(1).expect("id"))
            .expect("remove");
        assert_eq!(removed.image_path, "a.png");
        assert_eq!(ids(&session), vec![1, 2]);
        assert_eq!(session.captures()[0].image_path, "b.png");
        assert!(matches!(
            session.remove_capture(CaptureId::new(7).expect("id")),
            Err(DomainError::CaptureNotFound(7))
        ));
    }

    #[test]
    fn finish_keeps_duration_snapshot() {
        let mut session = session();
        session.finish("2026-10-16 09:01:05", 65);
        assert!(!session.is_active());
        assert_eq!(session.duration_secs(), 65);
        session.rename("Renamed").expect("rename");
        assert_eq!(session.duration_secs(), 65);
    }

    #[test]
    fn decode_requires_every_field() {
        let json = r#"{"id":"s","name":"Demo","description":"","start_time":"t","end_time":"","duration":0}"#;
        assert!(serde_json::from_str::<Session>(json).is_err());

        let zero_id = r#"{"id":"s","name":"Demo","description":"","start_time":"t","end_time":"","duration":0,
            "captures":[{"id":0,"time":"t","description":"d","image_path":"p"}]}"#;
        assert!(serde_json::from_str::<Session>(zero_id).is_err());
    }

    #[test]
    fn validate_detects_gaps() {
        let json = r#"{"id":"s","name":"Demo","description":"","start_time":"t","end_time":"","duration":0,
            "captures":[{"id":1,"time":"t","description":"d","image_path":"p"},
                        {"id":3,"time":"t","description":"d","image_path":"q"}]}"#;
        let session: Session = serde_json::from_str(json).expect("decode");
        assert!(matches!(
            session.validate(),
            Err(DomainError::CaptureIdsNotContiguous { position: 1, found: 3 })
        ));
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(5), "5s");
        assert_eq!(format_duration(125), "2m5s");
        assert_eq!(format_duration(3725), "1h2m");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Append,
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Append), (0usize..8).prop_map(Op::Remove)]
    }

    proptest! {
        #[test]
        fn capture_ids_stay_contiguous(ops in proptest::collection::vec(op(), 0..40)) {
            let mut session = session();
            for op in ops {
                match op {
                    Op::Append => {
                        session.append_capture("t", "", "x.png");
                    }
                    Op::Remove(index) => {
                        if let Some(capture) = session.captures().get(index).cloned() {
                            session.remove_capture(capture.id).expect("remove");
                        }
                    }
                }
                let expected: Vec<u32> = (1..=session.captures().len() as u32).collect();
                prop_assert_eq!(ids(&session), expected);
                prop_assert!(session.validate().is_ok());
            }
        }
    }
}
