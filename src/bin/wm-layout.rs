use std::path::PathBuf;
use std::process;

use anyhow::{Context, bail};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use strum::IntoEnumIterator;
use tracing::{debug, info};
use wm_layout::common::collections::{BTreeMap, HashMap};
use wm_layout::common::config::{Config, config_file};
use wm_layout::common::log;
use wm_layout::layout_engine::{
    AvoidArea, AvoidAreaType, DisplayInfo, DisplayZoomInfo, LayoutCommand, LayoutEvent,
    WindowLayoutEngine,
};
use wm_layout::model::{
    DisplayId, DragType, SizeChangeReason, WindowFlags, WindowId, WindowMode, WindowModeSupport,
    WindowNode, WindowSizeLimits, WindowType,
};
use wm_layout::sys::geometry::Rect;
use wm_layout::sys::transform::Transform;

#[derive(Parser)]
struct Cli {
    /// Scenario to replay, in RON.
    #[arg(value_name = "SCENARIO")]
    scenario: Option<PathBuf>,

    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Check the configuration file and exit.
    #[arg(long)]
    validate: bool,

    /// Print the window tree of each display instead of JSON.
    #[arg(long)]
    tree: bool,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct Scenario {
    /// Defaults to the first display.
    #[serde(default)]
    default_display: Option<DisplayId>,
    displays: Vec<DisplayInfo>,
    #[serde(default)]
    windows: Vec<WindowSpec>,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct WindowSpec {
    name: String,
    ty: WindowType,
    #[serde(default)]
    mode: WindowMode,
    #[serde(default)]
    display: DisplayId,
    #[serde(default)]
    rect: Rect,
    #[serde(default)]
    flags: WindowFlags,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    mode_support: Option<WindowModeSupport>,
    #[serde(default)]
    size_limits: Option<WindowSizeLimits>,
    #[serde(default)]
    decor: bool,
    #[serde(default)]
    hot_areas: Vec<Rect>,
    /// Register for avoid area updates right after the window is added.
    #[serde(default)]
    listen: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
enum Step {
    AddDisplay(DisplayInfo),
    RemoveDisplay(DisplayId),
    ChangeDisplay(DisplayInfo),
    Add(WindowSpec),
    Remove(String),
    Request {
        window: String,
        rect: Rect,
        #[serde(default)]
        reason: SizeChangeReason,
    },
    Mode {
        window: String,
        mode: WindowMode,
    },
    Show(String),
    Hide(String),
    /// Starts a drag, moves through every rect and ends on the last one.
    Drag {
        window: String,
        #[serde(default)]
        drag_type: DragType,
        rects: Vec<Rect>,
    },
    Focus(Option<String>),
    Listen(String),
    Unlisten(String),
    Command(LayoutCommand),
}

#[skip_serializing_none]
#[derive(Serialize)]
struct Report {
    displays: BTreeMap<DisplayId, Rect>,
    zoom: Option<DisplayZoomInfo>,
    windows: Vec<WindowReport>,
    minimized: Option<Vec<String>>,
}

#[skip_serializing_none]
#[derive(Serialize)]
struct WindowReport {
    name: String,
    ty: WindowType,
    mode: WindowMode,
    display: DisplayId,
    rect: Rect,
    touch_hot_areas: Vec<Rect>,
    pointer_hot_areas: Vec<Rect>,
    avoid_areas: Option<BTreeMap<AvoidAreaType, AvoidArea>>,
    zoom: Option<Transform>,
}

struct Replay {
    engine: WindowLayoutEngine,
    names: HashMap<String, WindowId>,
    order: Vec<String>,
    minimized: Vec<WindowId>,
}

impl Replay {
    fn new(config: Config, default_display: DisplayId) -> Self {
        Replay {
            engine: WindowLayoutEngine::new(config, default_display),
            names: HashMap::default(),
            order: Vec::new(),
            minimized: Vec::new(),
        }
    }

    fn window(&self, name: &str) -> anyhow::Result<WindowId> {
        match self.names.get(name) {
            Some(id) => Ok(*id),
            None => bail!("unknown window {name:?}"),
        }
    }

    fn event(&mut self, event: LayoutEvent) -> anyhow::Result<()> {
        let response = self.engine.handle_event(event)?;
        self.minimized.extend(response.minimize_windows);
        Ok(())
    }

    fn add(&mut self, spec: WindowSpec) -> anyhow::Result<()> {
        if self.names.contains_key(&spec.name) {
            bail!("duplicate window name {:?}", spec.name);
        }
        let mut node = WindowNode::new(spec.name.clone(), spec.ty, spec.mode, spec.display)
            .with_request_rect(spec.rect)
            .with_flags(spec.flags);
        if let Some(parent) = &spec.parent {
            node = node.with_parent(self.window(parent)?);
        }
        if let Some(support) = spec.mode_support {
            node.mode_support = support;
        }
        if let Some(limits) = spec.size_limits {
            node.size_limits = limits;
        }
        node.decor_enable = spec.decor;
        node.requested_hot_areas = spec.hot_areas;

        let response = self.engine.handle_event(LayoutEvent::WindowAdded(Box::new(node)))?;
        let Some(id) = response.added_window else {
            bail!("window {:?} was not added", spec.name);
        };
        self.names.insert(spec.name.clone(), id);
        if !self.order.contains(&spec.name) {
            self.order.push(spec.name);
        }
        if spec.listen {
            self.event(LayoutEvent::AvoidAreaListener { id, register: true })?;
        }
        Ok(())
    }

    fn step(&mut self, step: Step) -> anyhow::Result<()> {
        match step {
            Step::AddDisplay(info) => self.event(LayoutEvent::DisplayAdded(info))?,
            Step::RemoveDisplay(display) => self.event(LayoutEvent::DisplayRemoved(display))?,
            Step::ChangeDisplay(info) => self.event(LayoutEvent::DisplayChanged {
                display: info.id,
                rect: info.rect(),
                rotation: info.rotation,
                virtual_pixel_ratio: info.virtual_pixel_ratio,
            })?,
            Step::Add(spec) => self.add(spec)?,
            Step::Remove(name) => {
                let id = self.window(&name)?;
                let response = self.engine.handle_event(LayoutEvent::WindowRemoved(id))?;
                self.names.retain(|_, w| !response.removed_windows.contains(w));
            }
            Step::Request { window, rect, reason } => {
                let id = self.window(&window)?;
                self.event(LayoutEvent::WindowRequested { id, rect, reason })?;
            }
            Step::Mode { window, mode } => {
                let id = self.window(&window)?;
                self.event(LayoutEvent::WindowModeChanged { id, mode })?;
            }
            Step::Show(window) => {
                let id = self.window(&window)?;
                self.event(LayoutEvent::WindowVisibilityChanged { id, visible: true })?;
            }
            Step::Hide(window) => {
                let id = self.window(&window)?;
                self.event(LayoutEvent::WindowVisibilityChanged { id, visible: false })?;
            }
            Step::Drag { window, drag_type, rects } => {
                let id = self.window(&window)?;
                let Some((last, moves)) = rects.split_last() else {
                    bail!("drag of {window:?} has no rects");
                };
                self.event(LayoutEvent::DragStarted { id, drag_type })?;
                for rect in moves {
                    self.event(LayoutEvent::Dragged { id, rect: *rect })?;
                }
                self.event(LayoutEvent::DragEnded { id, rect: *last })?;
            }
            Step::Focus(window) => {
                let id = window.as_deref().map(|w| self.window(w)).transpose()?;
                self.event(LayoutEvent::WindowFocused(id))?;
            }
            Step::Listen(window) => {
                let id = self.window(&window)?;
                self.event(LayoutEvent::AvoidAreaListener { id, register: true })?;
            }
            Step::Unlisten(window) => {
                let id = self.window(&window)?;
                self.event(LayoutEvent::AvoidAreaListener { id, register: false })?;
            }
            Step::Command(command) => {
                let response = self.engine.handle_command(command);
                self.minimized.extend(response.minimize_windows);
            }
        }
        Ok(())
    }

    fn report(&self) -> Report {
        let engine = &self.engine;
        let zoom = engine.zoom();
        let windows = self
            .order
            .iter()
            .filter_map(|name| {
                let id = *self.names.get(name)?;
                let node = engine.window(id)?;
                let avoid_areas: BTreeMap<_, _> = AvoidAreaType::iter()
                    .map(|ty| (ty, engine.avoid_areas().avoid_area_by_type(engine.tree(), id, ty)))
                    .filter(|(_, area)| !area.is_empty())
                    .collect();
                Some(WindowReport {
                    name: name.clone(),
                    ty: node.ty,
                    mode: node.mode,
                    display: node.display_id,
                    rect: node.window_rect,
                    touch_hot_areas: node.touch_hot_areas.clone(),
                    pointer_hot_areas: node.pointer_hot_areas.clone(),
                    avoid_areas: (!avoid_areas.is_empty()).then_some(avoid_areas),
                    zoom: node.zoom_on.then_some(node.zoom_transform),
                })
            })
            .collect();
        let minimized: Vec<String> = self
            .minimized
            .iter()
            .filter_map(|id| engine.window(*id).map(|n| n.name.clone()))
            .collect();
        Report {
            displays: engine.displays().all_display_rects(),
            zoom: zoom.is_zoom_on().then(|| zoom.zoom_info()),
            windows,
            minimized: (!minimized.is_empty()).then_some(minimized),
        }
    }
}

fn main() {
    sigpipe::reset();
    let opt = Cli::parse();
    log::init_logging();

    if let Err(e) = run(opt) {
        eprintln!("{e:#}");
        process::exit(1);
    }
}

fn run(opt: Cli) -> anyhow::Result<()> {
    let config_path = opt.config.clone().unwrap_or_else(config_file);

    if opt.validate {
        let config = Config::read(&config_path)?;
        let issues = config.validate();
        if issues.is_empty() {
            println!("Config validation passed");
            return Ok(());
        }
        for issue in issues {
            eprintln!("{}", issue);
        }
        process::exit(1);
    }

    let config = if config_path.exists() {
        Config::read(&config_path)?
    } else {
        debug!(path = %config_path.display(), "no config file, using defaults");
        Config::default()
    };
    let issues = config.validate();
    if !issues.is_empty() {
        bail!("invalid config {}:\n{}", config_path.display(), issues.join("\n"));
    }

    let Some(path) = opt.scenario else {
        bail!("no scenario given");
    };
    let buf = std::fs::read_to_string(&path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    let scenario: Scenario =
        ron::from_str(&buf).with_context(|| format!("parsing scenario {}", path.display()))?;

    let Some(first) = scenario.displays.first() else {
        bail!("scenario has no displays");
    };
    let mut replay = Replay::new(config, scenario.default_display.unwrap_or(first.id));
    for info in scenario.displays {
        replay.event(LayoutEvent::DisplayAdded(info))?;
    }
    for spec in scenario.windows {
        let name = spec.name.clone();
        replay.add(spec).with_context(|| format!("adding window {name:?}"))?;
    }
    for (i, step) in scenario.steps.into_iter().enumerate() {
        replay.step(step).with_context(|| format!("step {i}"))?;
    }
    info!(windows = replay.names.len(), "scenario replayed");

    if opt.tree {
        for display in replay.engine.displays().display_ids() {
            println!("{display}");
            println!("{}", replay.engine.tree().draw_tree(display).trim_end());
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&replay.report())?);
    }
    Ok(())
}
