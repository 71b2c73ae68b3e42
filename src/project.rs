use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::canvas::{BufferSurface, Color, PixelBuffer, Point, clamp_dimension};
use crate::components::history::UndoHistory;
use crate::components::tools::{Tool, ToolKind, ToolOptions, ToolResult, tool_for_index};
use crate::io::{self, SessionDocument, SessionError};
use crate::settings::AppSettings;

// ============================================================================
// PENDING WRITE - debounced persistence, driven by the host's clock
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WriteState {
    #[default]
    Idle,
    Scheduled {
        due_ms: u64,
    },
}

/// At most one outstanding flush. A newer edit pushes the deadline out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingWrite {
    delay_ms: u64,
    state: WriteState,
}

impl PendingWrite {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            state: WriteState::Idle,
        }
    }

    pub fn state(&self) -> WriteState {
        self.state
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self.state, WriteState::Scheduled { .. })
    }

    /// Schedule a flush `delay_ms` after `now_ms`, superseding any earlier one.
    pub fn schedule(&mut self, now_ms: u64) {
        self.state = WriteState::Scheduled {
            due_ms: now_ms.saturating_add(self.delay_ms),
        };
    }

    pub fn cancel(&mut self) {
        self.state = WriteState::Idle;
    }

    /// True exactly once per scheduled flush, at or after its deadline.
    pub fn take_due(&mut self, now_ms: u64) -> bool {
        match self.state {
            WriteState::Scheduled { due_ms } if now_ms >= due_ms => {
                self.state = WriteState::Idle;
                true
            }
            _ => false,
        }
    }
}

impl Default for PendingWrite {
    fn default() -> Self {
        Self::new(500)
    }
}

// ============================================================================
// PROJECT - one logo being edited
// ============================================================================

/// Single open logo with its active tool and undo history.
pub struct Project {
    pub id: Uuid,
    /// `None` until first saved.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    logo: PixelBuffer,
    /// Overlay the active tool previews on; same size as the logo.
    preview: BufferSurface,
    tool: Box<dyn Tool>,
    tool_index: i64,
    options: ToolOptions,
    history: UndoHistory<PixelBuffer>,
    pending: PendingWrite,
    /// Last time reported by the host through [`Project::tick`].
    now_ms: u64,
}

impl Project {
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_settings(&AppSettings {
            canvas_width: width,
            canvas_height: height,
            ..AppSettings::default()
        })
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        let logo = PixelBuffer::new(settings.canvas_width, settings.canvas_height);
        Self::with_logo(logo, settings)
    }

    fn with_logo(logo: PixelBuffer, settings: &AppSettings) -> Self {
        let options = settings.tool_options();
        Self {
            id: Uuid::new_v4(),
            path: None,
            is_dirty: false,
            preview: BufferSurface::for_buffer(&logo),
            logo,
            tool: tool_for_index(settings.default_tool, options.clone()),
            tool_index: settings.default_tool,
            options,
            history: UndoHistory::new(settings.max_undo_steps),
            pending: PendingWrite::new(settings.autosave_delay_ms),
            now_ms: 0,
        }
    }

    pub fn logo(&self) -> &PixelBuffer {
        &self.logo
    }

    pub fn preview(&self) -> &PixelBuffer {
        self.preview.pixels()
    }

    pub fn options(&self) -> &ToolOptions {
        &self.options
    }

    pub fn tool_kind(&self) -> ToolKind {
        self.tool.kind()
    }

    pub fn tool_index(&self) -> i64 {
        self.tool_index
    }

    pub fn history(&self) -> &UndoHistory<PixelBuffer> {
        &self.history
    }

    pub fn pending_write(&self) -> &PendingWrite {
        &self.pending
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    /// Display name with a dirty indicator.
    pub fn display_title(&self) -> String {
        let name = self
            .path
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string());
        if self.is_dirty {
            format!("{}*", name)
        } else {
            name
        }
    }

    // -- Tools ----------------------------------------------------------------

    /// Switch tools by catalog index. An in-progress interaction is cancelled.
    pub fn select_tool(&mut self, index: i64) {
        self.tool.cancel(&mut self.preview);
        self.tool = tool_for_index(index, self.options.clone());
        self.tool_index = index;
        log_info!("Selected tool {} ({})", index, self.tool.kind().label());
    }

    pub fn set_options(&mut self, options: ToolOptions) {
        let options = ToolOptions::new(options.color, options.brush_size);
        self.tool.set_options(options.clone(), &mut self.preview);
        self.options = options;
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.set_options(ToolOptions::new(color, self.options.brush_size));
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.set_options(ToolOptions::new(self.options.color.clone(), size));
    }

    // -- Pointer events -------------------------------------------------------

    pub fn pointer_down(&mut self, point: Point) {
        if self.tool.is_active() {
            return;
        }
        self.tool.start(point, &self.logo, &mut self.preview);
    }

    pub fn pointer_move(&mut self, point: Point) {
        self.tool.move_to(point, &mut self.preview);
    }

    /// Finish the interaction. True when the logo changed.
    pub fn pointer_up(&mut self, point: Point) -> bool {
        match self.tool.end(point, &mut self.preview) {
            Some(result) => self.apply(result),
            None => false,
        }
    }

    pub fn cancel(&mut self) {
        self.tool.cancel(&mut self.preview);
    }

    fn apply(&mut self, result: ToolResult) -> bool {
        match result {
            ToolResult::AffectsBitmap(buffer) => self.commit(buffer),
            ToolResult::AffectsOptions(options) => {
                self.set_options(options);
                false
            }
        }
    }

    /// Replace the logo, recording the old one. Identical results are dropped.
    fn commit(&mut self, buffer: PixelBuffer) -> bool {
        if buffer == self.logo {
            return false;
        }
        let previous = std::mem::replace(&mut self.logo, buffer);
        self.history.record(previous);
        self.touch();
        true
    }

    fn touch(&mut self) {
        if self.preview.pixels().width() != self.logo.width()
            || self.preview.pixels().height() != self.logo.height()
        {
            self.preview = BufferSurface::for_buffer(&self.logo);
        }
        self.is_dirty = true;
        self.pending.schedule(self.now_ms);
    }

    // -- Whole-logo edits -----------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.tool.cancel(&mut self.preview);
        let current = std::mem::replace(&mut self.logo, PixelBuffer::new(1, 1));
        match self.history.undo(current) {
            Ok(previous) => {
                self.logo = previous;
                self.touch();
                true
            }
            Err(current) => {
                self.logo = current;
                false
            }
        }
    }

    pub fn redo(&mut self) -> bool {
        self.tool.cancel(&mut self.preview);
        let current = std::mem::replace(&mut self.logo, PixelBuffer::new(1, 1));
        match self.history.redo(current) {
            Ok(next) => {
                self.logo = next;
                self.touch();
                true
            }
            Err(current) => {
                self.logo = current;
                false
            }
        }
    }

    /// Erase the whole logo to transparent, as an undoable edit.
    pub fn clear(&mut self) -> bool {
        self.tool.cancel(&mut self.preview);
        let blank = PixelBuffer::new_filled(self.logo.width(), self.logo.height(), Color::TRANSPARENT);
        self.commit(blank)
    }

    /// Start over on a blank logo of the given (clamped) size, as an undoable edit.
    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        self.tool.cancel(&mut self.preview);
        let blank = PixelBuffer::new(clamp_dimension(width), clamp_dimension(height));
        self.commit(blank)
    }

    // -- Persistence ----------------------------------------------------------

    /// Advance the host clock. True when a scheduled flush is now due.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        self.now_ms = self.now_ms.max(now_ms);
        self.pending.take_due(self.now_ms)
    }

    pub fn to_document(&self) -> SessionDocument {
        SessionDocument {
            id: self.id,
            logo: self.logo.to_portable(),
            history: self.history.undo_entries().map(PixelBuffer::to_portable).collect(),
            options: self.options.clone(),
            tool: self.tool_index,
        }
    }

    /// Rebuild a session. An undecodable logo is an error; undecodable
    /// history snapshots are skipped.
    pub fn from_document(doc: &SessionDocument, settings: &AppSettings) -> Result<Self, SessionError> {
        let logo = PixelBuffer::decode_portable(&doc.logo)?;
        let settings = AppSettings {
            default_tool: doc.tool,
            default_color: doc.options.color.clone(),
            brush_size: doc.options.brush_size,
            ..settings.clone()
        };
        let mut project = Self::with_logo(logo, &settings);
        project.id = doc.id;
        project
            .history
            .restore(doc.history.iter().filter_map(PixelBuffer::from_portable));
        if project.history.undo_count() < doc.history.len().min(project.history.capacity()) {
            log_warn!(
                "Session {}: kept {} of {} history snapshots",
                doc.id,
                project.history.undo_count(),
                doc.history.len()
            );
        }
        Ok(project)
    }

    pub fn save(&mut self, path: &Path) -> Result<(), SessionError> {
        io::save_session(&self.to_document(), path)?;
        self.path = Some(path.to_path_buf());
        self.pending.cancel();
        self.mark_clean();
        Ok(())
    }

    pub fn open(path: &Path, settings: &AppSettings) -> Result<Self, SessionError> {
        let doc = io::load_session(path)?;
        let mut project = Self::from_document(&doc, settings)?;
        project.path = Some(path.to_path_buf());
        Ok(project)
    }
}
