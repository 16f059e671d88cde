//! Full-screen viewer navigation
//!
//! Pure state: the UI layer turns clicks and key presses into
//! [`ViewerCommand`]s and renders whatever page [`ViewerState`] points at.

/// How the gallery grid is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// Keys the viewer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerKey {
    Escape,
    ArrowLeft,
    ArrowRight,
}

impl ViewerKey {
    /// Map a DOM-style key name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Escape" => Some(ViewerKey::Escape),
            "ArrowLeft" => Some(ViewerKey::ArrowLeft),
            "ArrowRight" => Some(ViewerKey::ArrowRight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    Open(usize),
    Close,
    Prev,
    Next,
    Key(ViewerKey),
    ToggleMode,
}

/// Navigation state over a catalog of `len` pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerState {
    len: usize,
    current: usize,
    open: bool,
    mode: ViewMode,
}

impl ViewerState {
    pub fn new(len: usize) -> Self {
        ViewerState {
            len,
            current: 0,
            open: false,
            mode: ViewMode::Grid,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// 1-based number of the page on screen
    pub fn page_label(&self) -> usize {
        self.current + 1
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Show page `index`; out-of-range indices are ignored
    pub fn open(&mut self, index: usize) {
        if index < self.len {
            self.current = index;
            self.open = true;
        }
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Step by `direction` pages, wrapping around at both ends
    pub fn navigate(&mut self, direction: isize) {
        if self.len == 0 {
            return;
        }
        let len = self.len as isize;
        self.current = (self.current as isize + direction).rem_euclid(len) as usize;
        self.open = true;
    }

    /// The previous button is disabled on the first page
    pub fn can_go_prev(&self) -> bool {
        self.current != 0
    }

    /// The next button is disabled on the last page
    pub fn can_go_next(&self) -> bool {
        self.current + 1 < self.len
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            ViewMode::Grid => ViewMode::List,
            ViewMode::List => ViewMode::Grid,
        };
    }

    pub fn handle(&mut self, command: ViewerCommand) {
        match command {
            ViewerCommand::Open(index) => self.open(index),
            ViewerCommand::Close => self.close(),
            ViewerCommand::Prev => self.navigate(-1),
            ViewerCommand::Next => self.navigate(1),
            ViewerCommand::ToggleMode => self.toggle_mode(),
            // keys only matter while the viewer is showing
            ViewerCommand::Key(_) if !self.open => {}
            ViewerCommand::Key(ViewerKey::Escape) => self.close(),
            ViewerCommand::Key(ViewerKey::ArrowLeft) => self.navigate(-1),
            ViewerCommand::Key(ViewerKey::ArrowRight) => self.navigate(1),
        }
    }
}
