//! Text-selection capture.
//!
//! [`DocumentEvents`] is the document-level event source: hosts feed it the
//! selected text at the instant of a pointer or touch release. A mounted
//! [`SelectionCapture`] listens for those releases and keeps the last
//! non-empty passage as a [`SelectionSnapshot`]. Dropping the capture
//! removes its listeners.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;

pub type ListenerId = u64;

/// Which gesture ended the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    Pointer,
    Touch,
}

type Callback = Rc<dyn Fn(&str)>;

struct Listener {
    id: ListenerId,
    kind: ReleaseKind,
    callback: Callback,
}

#[derive(Default)]
struct Registry {
    listeners: RefCell<Vec<Listener>>,
    next_id: Cell<ListenerId>,
}

/// Document-level release events. Cloning yields another handle to the same
/// registry.
#[derive(Clone, Default)]
pub struct DocumentEvents {
    registry: Rc<Registry>,
}

impl DocumentEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, kind: ReleaseKind, callback: impl Fn(&str) + 'static) -> ListenerId {
        let id = self.registry.next_id.get() + 1;
        self.registry.next_id.set(id);
        self.registry.listeners.borrow_mut().push(Listener {
            id,
            kind,
            callback: Rc::new(callback),
        });
        id
    }

    /// Returns false when the id was not registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.registry.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.registry.listeners.borrow().len()
    }

    /// Deliver a release event with the host's current selection text.
    pub fn dispatch_release(&self, kind: ReleaseKind, selected_text: &str) {
        // Snapshot the callbacks so a listener may deregister while running.
        let callbacks: Vec<Callback> = self
            .registry
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| Rc::clone(&l.callback))
            .collect();

        for callback in callbacks {
            callback(selected_text);
        }
    }
}

/// The last captured non-empty selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSnapshot {
    text: String,
    source: ReleaseKind,
}

impl SelectionSnapshot {
    /// None when the trimmed text is empty
    pub fn capture(raw: &str, source: ReleaseKind) -> Option<Self> {
        let text = raw.trim();
        if text.is_empty() {
            None
        } else {
            Some(Self {
                text: text.to_string(),
                source,
            })
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> ReleaseKind {
        self.source
    }
}

/// Listens for selection-end gestures for as long as it is alive.
pub struct SelectionCapture {
    events: DocumentEvents,
    listeners: [ListenerId; 2],
    snapshot: Rc<RefCell<Option<SelectionSnapshot>>>,
}

impl SelectionCapture {
    pub fn mount(events: &DocumentEvents) -> Self {
        let snapshot: Rc<RefCell<Option<SelectionSnapshot>>> = Rc::new(RefCell::new(None));

        let listeners = [ReleaseKind::Pointer, ReleaseKind::Touch].map(|kind| {
            let slot = Rc::clone(&snapshot);
            events.add_listener(kind, move |raw| {
                // Empty releases are incidental clicks: keep what we have.
                if let Some(captured) = SelectionSnapshot::capture(raw, kind) {
                    trace!(len = captured.text.len(), ?kind, "selection captured");
                    *slot.borrow_mut() = Some(captured);
                }
            })
        });

        Self {
            events: events.clone(),
            listeners,
            snapshot,
        }
    }

    pub fn snapshot(&self) -> Option<SelectionSnapshot> {
        self.snapshot.borrow().clone()
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.borrow().is_some()
    }

    pub fn clear(&self) {
        self.snapshot.borrow_mut().take();
    }
}

impl Drop for SelectionCapture {
    fn drop(&mut self) {
        for id in self.listeners {
            self.events.remove_listener(id);
        }
    }
}

/// A (line, column) position in a page of text; columns count chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TextPosition {
    pub line: usize,
    pub column: usize,
}

impl TextPosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Drag selection over a page of lines. The end position is exclusive, so a
/// press and release at the same spot selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSelection {
    pub anchor: TextPosition,
    pub extent: TextPosition,
}

impl TextSelection {
    pub fn start_at(anchor: TextPosition) -> Self {
        Self { anchor, extent: anchor }
    }

    pub fn extend_to(&mut self, extent: TextPosition) {
        self.extent = extent;
    }

    /// Get normalized selection (start is never after end)
    pub fn normalized(&self) -> (TextPosition, TextPosition) {
        if self.anchor <= self.extent {
            (self.anchor, self.extent)
        } else {
            (self.extent, self.anchor)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.extent
    }

    pub fn contains(&self, pos: TextPosition) -> bool {
        let (start, end) = self.normalized();
        start <= pos && pos < end
    }

    /// Extract the selected text, joining lines with '\n'.
    pub fn text_in<S: AsRef<str>>(&self, lines: &[S]) -> String {
        let (start, end) = self.normalized();
        if start == end || start.line >= lines.len() {
            return String::new();
        }

        let last_line = end.line.min(lines.len() - 1);
        let mut parts = Vec::with_capacity(last_line - start.line + 1);

        for idx in start.line..=last_line {
            let line = lines[idx].as_ref();
            let from = if idx == start.line { start.column } else { 0 };
            let part: String = if idx == end.line {
                line.chars()
                    .skip(from)
                    .take(end.column.saturating_sub(from))
                    .collect()
            } else {
                line.chars().skip(from).collect()
            };
            parts.push(part);
        }

        parts.join("\n")
    }
}
