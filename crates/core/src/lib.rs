//! Core library for the Matrix Host runtime.
//!
//! The host drives an LED matrix through plugins on two fixed timers: the
//! control loop emits `update` at the configured tick while a plugin runs, and
//! the render loop emits `draw` and flushes the display regardless of state.
//! Plugins only ever see a [`Capabilities`] grant and the lifecycle events
//! relayed onto the [`PluginBus`].

pub mod broadcast;
pub mod capability;
pub mod config;
pub mod control;
pub mod error;
pub mod event;
pub mod geometry;
pub mod matrix;
pub mod palette;
pub mod plugin;
pub mod remote;
pub mod render;
pub mod runtime;
pub mod timeline;

#[cfg(test)]
pub(crate) mod testing;

pub use broadcast::{Broadcast, TracingBroadcast};
pub use capability::Capabilities;
pub use config::{HostConfig, AUTOSTART_ENV, MATRIX_URL_ENV};
pub use control::{ControlLoop, LoopState, TickInterval, PLUGIN_CHANNEL};
pub use error::{HostError, Result};
pub use event::{
    relay, Command, Event, EventBus, Notification, NotificationKind, PluginBus, PLUGIN_EVENTS,
};
pub use geometry::{Geometry, Point};
pub use matrix::{Display, LedMatrix, SharedDisplay};
pub use palette::{Palette, Rgb, PALETTE};
pub use plugin::{Plugin, PluginLoader, PluginRegistry};
pub use remote::{
    ButtonEvent, ButtonState, ChannelRemote, RemoteAction, RemoteInputAdapter, RemoteMessage,
    RemoteSource,
};
pub use render::RenderLoop;
pub use runtime::Host;
pub use timeline::{LoopClock, Scheduler, TimerKind};
