//! Foreground-app fullscreen detection.

use std::process::Command;

use serde::Deserialize;

/// Best-effort answer to "is the foreground application fullscreen?".
///
/// The coordinator samples this on app switches, workspace changes, and
/// gate-preference toggles. When the capability is unavailable (missing
/// permission, unsupported compositor) implementations must return
/// `false`; the caller treats that exactly like a normal negative
/// reading.
pub trait EnvironmentProbe: Send + Sync {
    fn is_fullscreen_active(&self) -> bool;
}

/// Probe for environments with no fullscreen detection. Always reads
/// false.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProbe;

impl EnvironmentProbe for NullProbe {
    fn is_fullscreen_active(&self) -> bool {
        false
    }
}

/// Queries the Hyprland compositor through `hyprctl activewindow -j`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HyprlandProbe;

#[derive(Debug, Deserialize)]
struct HyprlandWindow {
    // Bool up to Hyprland 0.41, fullscreen-mode integer after.
    #[serde(default)]
    fullscreen: serde_json::Value,
}

impl HyprlandWindow {
    fn is_fullscreen(&self) -> bool {
        match &self.fullscreen {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
            _ => false,
        }
    }
}

impl EnvironmentProbe for HyprlandProbe {
    fn is_fullscreen_active(&self) -> bool {
        match query_active_window() {
            Ok(window) => window.is_fullscreen(),
            Err(e) => {
                tracing::debug!(error = %e, "fullscreen probe unavailable");
                false
            }
        }
    }
}

fn query_active_window() -> Result<HyprlandWindow, Box<dyn std::error::Error>> {
    let output = Command::new("hyprctl")
        .args(["activewindow", "-j"])
        .output()?;

    if !output.status.success() {
        return Err("hyprctl exited with failure".into());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        return Err("no active window".into());
    }

    Ok(serde_json::from_str(&stdout)?)
}
