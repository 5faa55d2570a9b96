use std::{fs, io, path::Path};

use thiserror::Error;

use super::*;

#[derive(Debug, Error)]
pub enum LoadReplayError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse replay YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("replay has no events")]
    NoEvents,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReplayFile {
    name: String,
    #[serde(default)]
    events: Vec<Event>,
    #[serde(default)]
    around: Vec<String>,
}

impl Replay {
    #[tracing::instrument(skip(path))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadReplayError> {
        let path = path.as_ref();

        tracing::debug!("loading replay at path {}", path.display());
        let input = fs::read_to_string(path)?;

        Replay::parse(&input)
    }

    pub fn parse(input: &str) -> Result<Self, LoadReplayError> {
        let file: ReplayFile = serde_yaml::from_str(input)?;

        if file.events.is_empty() {
            return Err(LoadReplayError::NoEvents);
        }
        tracing::trace!("replay {} has {} events", file.name, file.events.len());

        Ok(Replay {
            name: file.name,
            events: file.events,
            around: file.around,
        })
    }
}

impl Config {
    #[tracing::instrument(skip(path))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadReplayError> {
        let path = path.as_ref();

        tracing::debug!("loading config {}", path.display());
        let input = fs::read_to_string(path)?;

        Ok(toml::from_str(&input)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const REPLAY: &str = "\
name: weekly
events:
  - set alice 100
  - set bob 200
  - remove bob
around: [alice]
";

    #[test]
    fn load_replay() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(REPLAY.as_bytes()).unwrap();

        let replay = Replay::load(file.path()).unwrap();
        assert_eq!(replay.name, "weekly");
        assert_eq!(
            replay.events,
            vec![
                Event::Set {
                    id: String::from("alice"),
                    score: 100
                },
                Event::Set {
                    id: String::from("bob"),
                    score: 200
                },
                Event::Remove {
                    id: String::from("bob")
                },
            ]
        );
        assert_eq!(replay.around, vec![String::from("alice")]);
    }

    #[test]
    fn reject_bad_replays() {
        assert!(matches!(
            Replay::parse("name: empty\n"),
            Err(LoadReplayError::NoEvents)
        ));
        assert!(matches!(
            Replay::parse("name: bad\nevents: [\"set alice lots\"]\n"),
            Err(LoadReplayError::Yaml(_))
        ));
        assert!(matches!(
            Replay::parse("name: x\nevents: [\"remove a\"]\nextra: 1\n"),
            Err(LoadReplayError::Yaml(_))
        ));
        assert!(matches!(
            Replay::load("/nonexistent/replay.yaml"),
            Err(LoadReplayError::Io(_))
        ));
    }

    #[test]
    fn load_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"top = 3\ncolor = false\n").unwrap();

        assert_eq!(
            Config::load(file.path()).unwrap(),
            Config {
                top: 3,
                window: 5,
                color: false
            }
        );

        assert_eq!(toml::from_str::<Config>("").unwrap(), Config::default());
        assert!(toml::from_str::<Config>("size = 1").is_err());
    }
}
