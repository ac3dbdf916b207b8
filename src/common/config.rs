use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::common::collections::HashMap;
use crate::reactor::bindings::Backend;
use crate::reactor::commands::{MouseAction, WmCommand};

pub fn config_file() -> PathBuf { dirs::home_dir().unwrap().join(".lattice.toml") }

/// A key binding value as it appears in the config file. Guarded bindings are
/// only dispatched when the running backend matches; the check happens at
/// dispatch time, not at bind time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum KeyBinding {
    Plain(WmCommand),
    Guarded { command: WmCommand, when: Backend },
}

impl KeyBinding {
    pub fn command(&self) -> &WmCommand {
        match self {
            KeyBinding::Plain(command) => command,
            KeyBinding::Guarded { command, .. } => command,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    #[serde(default = "default_border_width")]
    pub border_width: f64,
    #[serde(default = "default_margin")]
    pub margin: f64,
    #[serde(default = "default_grow_amount")]
    pub grow_amount: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            border_width: default_border_width(),
            margin: default_margin(),
            grow_amount: default_grow_amount(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_terminal")]
    pub terminal: String,
    #[serde(default = "default_modifier")]
    pub modifier: String,
    /// Read by the backend's pointer integration; the core never consults it.
    #[serde(default = "yes")]
    pub follow_mouse_focus: bool,
    #[serde(default)]
    pub layout: LayoutSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            terminal: default_terminal(),
            modifier: default_modifier(),
            follow_mouse_focus: true,
            layout: LayoutSettings::default(),
        }
    }
}

/// One algorithm in a group's layout cycle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutSpec {
    RatioTile,
    Columns {
        #[serde(default = "default_num_columns")]
        num_columns: usize,
    },
    Max,
    Tile {
        #[serde(default = "default_ratio")]
        ratio: f64,
    },
    Floating,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    pub name: String,
}

/// A hidden utility group bound to a single window. The window is launched on
/// first toggle and captured by class when it maps; subsequent toggles reuse
/// the same handle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScratchpadConfig {
    pub name: String,
    pub command: String,
    /// Window class that identifies the scratch window when it maps.
    pub class: String,
    /// Placement as fractions of the screen rect.
    #[serde(default = "default_scratch_x")]
    pub x: f64,
    #[serde(default = "default_scratch_y")]
    pub y: f64,
    #[serde(default = "default_scratch_width")]
    pub width: f64,
    #[serde(default = "default_scratch_height")]
    pub height: f64,
}

/// Predicate half of a placement rule. An empty matcher never matches.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleMatch {
    pub class: Option<String>,
    pub title: Option<String>,
}

impl RuleMatch {
    pub fn matches(&self, class: &str, title: &str) -> bool {
        if self.class.is_none() && self.title.is_none() {
            return false;
        }
        self.class.as_deref().is_none_or(|p| p == class)
            && self.title.as_deref().is_none_or(|p| p == title)
    }
}

/// Placement rules are evaluated top to bottom; the first match wins.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WindowRule {
    #[serde(rename = "match")]
    pub matcher: RuleMatch,
    #[serde(default)]
    pub floating: bool,
    /// Send matching windows to this group instead of the active one.
    pub group: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default = "default_keys")]
    pub keys: HashMap<String, KeyBinding>,
    #[serde(default = "default_mouse")]
    pub mouse: HashMap<String, MouseAction>,
    #[serde(default = "default_groups")]
    pub groups: Vec<GroupConfig>,
    #[serde(default = "default_scratchpads")]
    pub scratchpads: Vec<ScratchpadConfig>,
    #[serde(default = "default_rules")]
    pub rules: Vec<WindowRule>,
    #[serde(default = "default_layouts")]
    pub layouts: Vec<LayoutSpec>,
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            keys: default_keys(),
            mouse: default_mouse(),
            groups: default_groups(),
            scratchpads: default_scratchpads(),
            rules: default_rules(),
            layouts: default_layouts(),
            palette: default_palette(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("parsing config from {}", path.display()))?;
        for issue in config.validate() {
            warn!(%issue, "config issue");
        }
        Ok(config)
    }

    /// Non-fatal problems. Fatal ones (empty layout list, duplicate group
    /// names, unparsable bindings) are rejected when the reactor is built,
    /// before the event loop starts.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (index, rule) in self.rules.iter().enumerate() {
            if rule.matcher.class.is_none() && rule.matcher.title.is_none() {
                issues.push(format!("rule {index} has no class or title predicate"));
            }
            if let Some(group) = &rule.group {
                if !self.groups.iter().any(|g| &g.name == group) {
                    issues.push(format!("rule {index} targets unknown group '{group}'"));
                }
            }
        }

        for pad in &self.scratchpads {
            for (field, value) in [
                ("x", pad.x),
                ("y", pad.y),
                ("width", pad.width),
                ("height", pad.height),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    issues.push(format!(
                        "scratchpad '{}' has {} = {} outside [0, 1]",
                        pad.name, field, value
                    ));
                }
            }
        }

        if self.settings.layout.margin < 0.0 {
            issues.push("layout.margin must not be negative".to_string());
        }

        issues
    }
}

fn yes() -> bool { true }
fn default_border_width() -> f64 { 3.0 }
fn default_margin() -> f64 { 4.0 }
fn default_grow_amount() -> f64 { 30.0 }
fn default_terminal() -> String { "xterm".to_string() }
fn default_modifier() -> String { "mod4".to_string() }
fn default_num_columns() -> usize { 2 }
fn default_ratio() -> f64 { 0.5 }
fn default_scratch_x() -> f64 { 0.1 }
fn default_scratch_y() -> f64 { 0.2 }
fn default_scratch_width() -> f64 { 0.8 }
fn default_scratch_height() -> f64 { 0.5 }

fn default_groups() -> Vec<GroupConfig> {
    (1..=9)
        .map(|i| GroupConfig {
            name: i.to_string(),
        })
        .collect()
}

fn default_scratchpads() -> Vec<ScratchpadConfig> {
    vec![ScratchpadConfig {
        name: "scratchpad".to_string(),
        command: "/usr/bin/thunar".to_string(),
        class: "thunar".to_string(),
        x: default_scratch_x(),
        y: default_scratch_y(),
        width: default_scratch_width(),
        height: default_scratch_height(),
    }]
}

fn default_layouts() -> Vec<LayoutSpec> {
    vec![
        LayoutSpec::RatioTile,
        LayoutSpec::Columns {
            num_columns: default_num_columns(),
        },
        LayoutSpec::Max,
        LayoutSpec::Tile {
            ratio: default_ratio(),
        },
        LayoutSpec::Floating,
    ]
}

fn default_rules() -> Vec<WindowRule> {
    let float_class = |class: &str| WindowRule {
        matcher: RuleMatch {
            class: Some(class.to_string()),
            title: None,
        },
        floating: true,
        group: None,
    };
    let float_title = |title: &str| WindowRule {
        matcher: RuleMatch {
            class: None,
            title: Some(title.to_string()),
        },
        floating: true,
        group: None,
    };
    vec![
        float_class("confirmreset"),
        float_class("makebranch"),
        float_class("maketag"),
        float_class("ssh-askpass"),
        float_title("branchdialog"),
        float_title("pinentry"),
    ]
}

fn default_keys() -> HashMap<String, KeyBinding> {
    use crate::layout_engine::Direction::*;

    let mut keys = HashMap::default();
    let mut bind = |chord: &str, command: WmCommand| {
        keys.insert(chord.to_string(), KeyBinding::Plain(command));
    };

    bind("mod+h", WmCommand::MoveFocus(Left));
    bind("mod+l", WmCommand::MoveFocus(Right));
    bind("mod+j", WmCommand::MoveFocus(Down));
    bind("mod+k", WmCommand::MoveFocus(Up));
    bind("mod+space", WmCommand::FocusNext);
    bind("mod+shift+h", WmCommand::Shuffle(Left));
    bind("mod+shift+l", WmCommand::Shuffle(Right));
    bind("mod+shift+j", WmCommand::Shuffle(Down));
    bind("mod+shift+k", WmCommand::Shuffle(Up));
    bind("mod+control+h", WmCommand::Grow(Left));
    bind("mod+control+l", WmCommand::Grow(Right));
    bind("mod+control+j", WmCommand::Grow(Down));
    bind("mod+control+k", WmCommand::Grow(Up));
    bind("mod+n", WmCommand::Normalize);
    bind("mod+Return", WmCommand::SpawnTerminal);
    bind("mod+Tab", WmCommand::NextLayout);
    bind("mod+w", WmCommand::CloseFocused);
    bind("mod+f", WmCommand::ToggleFullscreen);
    bind("mod+t", WmCommand::ToggleFloating);
    bind("mod+z", WmCommand::ToggleScratchpad("scratchpad".to_string()));

    for i in 1..=9u32 {
        bind(
            &format!("mod+{i}"),
            WmCommand::SwitchToGroup(i.to_string()),
        );
        bind(
            &format!("mod+shift+{i}"),
            WmCommand::MoveWindowToGroup {
                group: i.to_string(),
                follow: true,
            },
        );
    }

    keys
}

fn default_mouse() -> HashMap<String, MouseAction> {
    let mut mouse = HashMap::default();
    mouse.insert("mod+Button1".to_string(), MouseAction::Move);
    mouse.insert("mod+Button3".to_string(), MouseAction::Resize);
    mouse.insert("mod+Button2".to_string(), MouseAction::Raise);
    mouse
}

fn default_palette() -> Vec<String> {
    // gruvbox dark
    [
        "#282828", "#928374", "#1d2021", "#cc241d", "#fb4934", "#32302f", "#98971a", "#b8bb26",
        "#3c3836", "#a89984", "#d79921", "#fabd2f", "#504945", "#bdae93", "#458588", "#83a598",
        "#665c54", "#d5c4a1", "#b16286", "#d3869b", "#689d6a", "#8ec07c", "#ebdbb2", "#d65d0e",
        "#fe8019",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_config_has_no_issues() {
        assert_eq!(Config::default().validate(), Vec::<String>::new());
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let raw = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&raw).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn load_reads_partial_file_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[settings]
terminal = "alacritty"
"#
        )
        .unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.settings.terminal, "alacritty");
        assert_eq!(config.groups.len(), 9);
        assert_eq!(config.layouts.len(), 5);
    }

    #[test]
    fn load_rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[settings]\nnot_a_field = 1").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn rule_without_predicate_is_reported() {
        let mut config = Config::default();
        config.rules.push(WindowRule::default());
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("no class or title"));
    }

    #[test]
    fn rule_match_requires_all_given_fields() {
        let rule = RuleMatch {
            class: Some("gitk".to_string()),
            title: Some("branchdialog".to_string()),
        };
        assert!(rule.matches("gitk", "branchdialog"));
        assert!(!rule.matches("gitk", "other"));
        assert!(!RuleMatch::default().matches("anything", "anything"));
    }

    #[test]
    fn guarded_binding_parses_from_toml() {
        let raw = r#"
[keys]
"mod+v" = { command = "spawn_terminal", when = "wayland" }
"mod+x" = "close_focused"
"#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(
            config.keys["mod+v"],
            KeyBinding::Guarded {
                command: WmCommand::SpawnTerminal,
                when: Backend::Wayland,
            }
        );
        assert_eq!(
            config.keys["mod+x"],
            KeyBinding::Plain(WmCommand::CloseFocused)
        );
    }
}
