//! Input management system
//!
//! Backends feed [`InputEvent`]s into [`Input`]; systems read the resulting
//! per-input [`KeyState`]s. Transient states decay once per simulated tick:
//! `Pressed` becomes `Held` and `Released` disappears.
//!
//! Logical names can alias several physical inputs. Reading a logical name
//! yields the most recent state among its physical inputs, while checks such
//! as [`Input::is_held`] hold when any of them matches.

use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};

/// State of one input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    /// Went down since the last update
    Pressed,
    /// Down for more than one update
    Held,
    /// Went up since the last update
    Released,
}

/// Physical edge reported by an input backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Input went down
    Pressed,
    /// Input went up
    Released,
}

/// Event reported by an input backend
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    /// Physical input name, e.g. `"ArrowLeft"`
    pub input: String,
    /// Edge that happened
    pub transition: Transition,
    /// Backend timestamp in seconds
    pub timestamp: f64,
}

impl InputEvent {
    /// Press event
    pub fn pressed(input: impl Into<String>, timestamp: f64) -> Self {
        Self {
            input: input.into(),
            transition: Transition::Pressed,
            timestamp,
        }
    }

    /// Release event
    pub fn released(input: impl Into<String>, timestamp: f64) -> Self {
        Self {
            input: input.into(),
            transition: Transition::Released,
            timestamp,
        }
    }
}

/// Tracked state of one input
#[derive(Debug, Clone, PartialEq)]
pub struct InputState {
    /// Input name (logical when resolved through an alias)
    pub name: String,
    /// Current state
    pub state: KeyState,
    /// Time the input first entered a tracked state
    pub timestamp: f64,
}

/// Input state shared with systems
#[derive(Debug, Clone, Default)]
pub struct Input {
    aliases: HashMap<String, Vec<String>>,
    current: IndexMap<String, InputState>,
}

impl Input {
    /// Create input state with no aliases
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: map a logical name onto physical inputs
    pub fn with_alias<I, S>(mut self, name: impl Into<String>, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_alias(name, inputs);
        self
    }

    /// Map a logical name onto physical inputs, replacing any previous mapping
    pub fn set_alias<I, S>(&mut self, name: impl Into<String>, inputs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases
            .insert(name.into(), inputs.into_iter().map(Into::into).collect());
    }

    /// Merge a whole alias table, e.g. from configuration
    pub fn extend_aliases(&mut self, aliases: &BTreeMap<String, Vec<String>>) {
        for (name, inputs) in aliases {
            self.set_alias(name.clone(), inputs.iter().cloned());
        }
    }

    /// Physical inputs behind a logical name
    pub fn alias(&self, name: &str) -> Option<&[String]> {
        self.aliases.get(name).map(Vec::as_slice)
    }

    /// Apply a backend event
    ///
    /// A press of an input that already has a state is ignored, which
    /// suppresses key repeat.
    pub fn apply(&mut self, event: &InputEvent) {
        match event.transition {
            Transition::Pressed => {
                if self.current.contains_key(&event.input) {
                    return;
                }
                self.set_state(&event.input, Some(KeyState::Pressed), event.timestamp);
            }
            Transition::Released => {
                self.set_state(&event.input, Some(KeyState::Released), event.timestamp);
            }
        }
    }

    /// Set or clear the state of a physical input
    ///
    /// An input that already has a state keeps its original timestamp.
    pub fn set_state(&mut self, name: &str, state: Option<KeyState>, timestamp: f64) {
        let Some(state) = state else {
            self.current.shift_remove(name);
            return;
        };

        match self.current.get_mut(name) {
            Some(existing) => existing.state = state,
            None => {
                self.current.insert(
                    name.to_string(),
                    InputState {
                        name: name.to_string(),
                        state,
                        timestamp,
                    },
                );
            }
        }
    }

    /// State of a physical input or logical alias
    ///
    /// An alias reports the most recent state among its physical inputs.
    pub fn state(&self, name: &str) -> Option<&InputState> {
        self.physical(name)
            .fold(None, |best: Option<&InputState>, candidate| match best {
                Some(best) if best.timestamp >= candidate.timestamp => Some(best),
                _ => Some(candidate),
            })
    }

    /// Tracked states behind a name: the alias targets, or the input itself
    fn physical<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a InputState> + 'a {
        let (inputs, direct): (&'a [String], _) = match self.aliases.get(name) {
            Some(inputs) => (inputs.as_slice(), None),
            None => (&[][..], self.current.get(name)),
        };
        inputs
            .iter()
            .filter_map(move |input| self.current.get(input))
            .chain(direct)
    }

    /// Whether any of the inputs went down since the last update
    pub fn was_pressed(&self, inputs: &[&str]) -> bool {
        self.any_in(inputs, &[KeyState::Pressed])
    }

    /// Whether any of the inputs is down
    pub fn is_held(&self, inputs: &[&str]) -> bool {
        self.any_in(inputs, &[KeyState::Pressed, KeyState::Held])
    }

    /// Whether any of the inputs went up since the last update
    pub fn was_released(&self, inputs: &[&str]) -> bool {
        self.any_in(inputs, &[KeyState::Released])
    }

    /// Any physical input behind any of `inputs` is in one of `states`
    fn any_in(&self, inputs: &[&str], states: &[KeyState]) -> bool {
        inputs
            .iter()
            .flat_map(|input| self.physical(*input))
            .any(|state| states.contains(&state.state))
    }

    /// Most recent input among `inputs` whose state is one of `states`
    ///
    /// Aliases are matched through their physical inputs; the returned state
    /// is named after the queried input.
    pub fn last(&self, states: &[KeyState], inputs: &[&str]) -> Option<InputState> {
        let mut most_recent: Option<InputState> = None;

        for input in inputs {
            let Some(current) = self
                .physical(*input)
                .filter(|state| states.contains(&state.state))
                .max_by(|a, b| a.timestamp.total_cmp(&b.timestamp))
            else {
                continue;
            };
            if most_recent
                .as_ref()
                .map_or(true, |recent| current.timestamp > recent.timestamp)
            {
                most_recent = Some(InputState {
                    name: (*input).to_string(),
                    state: current.state,
                    timestamp: current.timestamp,
                });
            }
        }

        most_recent
    }

    /// Decay transient states; run once per simulated tick
    pub fn update(&mut self) {
        self.current.retain(|_, input| match input.state {
            KeyState::Pressed => {
                input.state = KeyState::Held;
                true
            }
            KeyState::Held => true,
            KeyState::Released => false,
        });
    }

    /// Every tracked physical input
    pub fn iter(&self) -> impl Iterator<Item = &InputState> {
        self.current.values()
    }

    /// Forget every tracked state
    pub fn clear(&mut self) {
        self.current.clear();
    }
}
