//! Config actor: owns the live [`Config`], applies runtime mutations, and
//! pushes accepted changes to the reactor.

use std::fmt;
use std::path::PathBuf;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::actor::{self, reactor};
use crate::common::config::{Config, ConfigCommand};

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

pub enum Event {
    Query(oneshot::Sender<Config>),
    Apply {
        cmd: ConfigCommand,
        response: Option<oneshot::Sender<Result<(), String>>>,
    },
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Query(_) => f.write_str("Query(..)"),
            Event::Apply { cmd, .. } => write!(f, "Apply({cmd:?})"),
        }
    }
}

pub struct ConfigActor {
    config: Config,
    reactor_tx: reactor::Sender,
    config_path: PathBuf,
}

impl ConfigActor {
    pub fn spawn(config: Config, reactor_tx: reactor::Sender, config_path: PathBuf) -> Sender {
        let (tx, rx) = actor::channel();
        std::thread::Builder::new()
            .name("config".to_string())
            .spawn(move || {
                let actor = ConfigActor {
                    config,
                    reactor_tx,
                    config_path,
                };
                crate::sys::executor::Executor::run(actor.run(rx));
            })
            .unwrap();
        tx
    }

    async fn run(mut self, mut events: Receiver) {
        while let Some((span, event)) = events.recv().await {
            let _guard = span.enter();
            match event {
                Event::Query(response) => {
                    _ = response.send(self.config.clone());
                }
                Event::Apply { cmd, response } => {
                    let result = self.handle_config_command(cmd);
                    if let Some(response) = response {
                        _ = response.send(result);
                    }
                }
            }
        }
    }

    fn handle_config_command(&mut self, cmd: ConfigCommand) -> Result<(), String> {
        debug!("applying config command: {:?}", cmd);
        match cmd {
            ConfigCommand::Set { key, value } => {
                let mut next = self.config.clone();
                Self::apply_set(&mut next, &key, &value)?;
                let issues = next.validate();
                if !issues.is_empty() {
                    return Err(issues.join("; "));
                }
                info!("updated {} to {}", key, value);
                self.publish(next);
                Ok(())
            }
            ConfigCommand::GetConfig => Ok(()),
            ConfigCommand::SaveConfig => {
                self.config.save(&self.config_path).map_err(|e| e.to_string())
            }
            ConfigCommand::ReloadConfig => match Config::read(&self.config_path) {
                Ok(next) => {
                    info!("configuration file reloaded");
                    self.publish(next);
                    Ok(())
                }
                Err(e) => {
                    warn!("config reload failed: {e}");
                    Err(e.to_string())
                }
            },
        }
    }

    fn apply_set(config: &mut Config, key: &str, value: &serde_json::Value) -> Result<(), String> {
        fn number(value: &serde_json::Value, key: &str) -> Result<f64, String> {
            value.as_f64().ok_or_else(|| format!("{key} expects a number"))
        }
        fn flag(value: &serde_json::Value, key: &str) -> Result<bool, String> {
            value.as_bool().ok_or_else(|| format!("{key} expects a boolean"))
        }
        match key {
            "settings.gap" => config.settings.gap = number(value, key)?,
            "settings.border_width" => config.settings.border_width = number(value, key)?,
            "settings.follow_mouse_focus" => {
                config.settings.follow_mouse_focus = flag(value, key)?
            }
            "settings.hot_reload" => config.settings.hot_reload = flag(value, key)?,
            "bar.enabled" => config.bar.enabled = flag(value, key)?,
            "bar.height" => config.bar.height = number(value, key)?,
            other => return Err(format!("unknown config key: {other}")),
        }
        Ok(())
    }

    fn publish(&mut self, next: Config) {
        self.config = next;
        self.reactor_tx.send(reactor::Event::ConfigUpdated(Box::new(self.config.clone())));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::actor::channel;

    fn actor() -> (ConfigActor, crate::actor::Receiver<reactor::Event>) {
        let (reactor_tx, reactor_rx) = channel();
        let actor = ConfigActor {
            config: Config::default(),
            reactor_tx,
            config_path: PathBuf::from("/nonexistent/config.toml"),
        };
        (actor, reactor_rx)
    }

    #[test]
    fn set_updates_and_notifies_the_reactor() {
        let (mut actor, mut reactor_rx) = actor();
        actor
            .handle_config_command(ConfigCommand::Set {
                key: "settings.gap".into(),
                value: json!(8.0),
            })
            .unwrap();
        assert_eq!(actor.config.settings.gap, 8.0);
        let (_span, event) = reactor_rx.try_recv().unwrap();
        assert!(matches!(
            event,
            reactor::Event::ConfigUpdated(config) if config.settings.gap == 8.0
        ));
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let (mut actor, mut reactor_rx) = actor();
        assert!(
            actor
                .handle_config_command(ConfigCommand::Set {
                    key: "settings.unknown".into(),
                    value: json!(1),
                })
                .is_err()
        );
        assert!(
            actor
                .handle_config_command(ConfigCommand::Set {
                    key: "settings.gap".into(),
                    value: json!("wide"),
                })
                .is_err()
        );
        // Values that fail validation are rejected as a unit.
        assert!(
            actor
                .handle_config_command(ConfigCommand::Set {
                    key: "settings.gap".into(),
                    value: json!(-4.0),
                })
                .is_err()
        );
        assert!(reactor_rx.try_recv().is_err());
    }

    #[test]
    fn reload_from_a_missing_file_fails_cleanly() {
        let (mut actor, mut reactor_rx) = actor();
        assert!(actor.handle_config_command(ConfigCommand::ReloadConfig).is_err());
        assert!(reactor_rx.try_recv().is_err());
    }
}
