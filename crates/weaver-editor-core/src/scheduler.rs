//! Deferred work on a virtual frame clock.
//!
//! Corrections that must observe the DOM after the host applied a native
//! edit (the delimiter retype fix) are queued here instead of running inline.
//! The host advances the clock once per animation frame through
//! [`Editor::run_animation_frame`]; tests drive it the same way.

use std::collections::VecDeque;
use std::fmt;

use crate::editor::Editor;

pub type FrameTask = Box<dyn FnOnce(&mut Editor)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

struct ScheduledTask {
    id: TaskId,
    label: &'static str,
    due_frame: u64,
    task: FrameTask,
}

#[derive(Default)]
pub struct Scheduler {
    frame: u64,
    next_id: u64,
    queue: VecDeque<ScheduledTask>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("frame", &self.frame)
            .field(
                "queue",
                &self.queue.iter().map(|t| (t.id, t.label)).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Scheduler {
    /// Run `task` on the next frame.
    pub fn schedule_frame(&mut self, label: &'static str, task: FrameTask) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        tracing::trace!(label, frame = self.frame, "scheduled frame task");
        self.queue.push_back(ScheduledTask {
            id,
            label,
            due_frame: self.frame + 1,
            task,
        });
        id
    }

    /// Drop a task that has not run yet. Returns whether it was pending.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|t| t.id != id);
        self.queue.len() != before
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// Advance one frame and hand back the tasks now due, in schedule order.
    pub(crate) fn advance(&mut self) -> Vec<(&'static str, FrameTask)> {
        self.frame += 1;
        let frame = self.frame;
        let (due, later): (VecDeque<_>, VecDeque<_>) =
            self.queue.drain(..).partition(|t| t.due_frame <= frame);
        self.queue = later;
        due.into_iter().map(|t| (t.label, t.task)).collect()
    }
}

impl Editor {
    /// Advance the frame clock and run every task that became due.
    /// Returns the number of tasks run.
    pub fn run_animation_frame(&mut self) -> usize {
        let due = self.scheduler.advance();
        let count = due.len();
        for (label, task) in due {
            tracing::trace!(label, "running frame task");
            task(self);
        }
        count
    }

    /// Keep running frames until nothing is queued. Tasks scheduling further
    /// tasks are followed, up to a fixed number of frames.
    pub fn run_pending_frames(&mut self) -> usize {
        const MAX_FRAMES: usize = 64;
        let mut total = 0;
        for _ in 0..MAX_FRAMES {
            if self.scheduler.pending_count() == 0 {
                break;
            }
            total += self.run_animation_frame();
        }
        total
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn schedule_frame(&mut self, label: &'static str, task: FrameTask) -> TaskId {
        self.scheduler.schedule_frame(label, task)
    }

    pub fn cancel_frame_task(&mut self, id: TaskId) -> bool {
        self.scheduler.cancel(id)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::options::EditorOptions;

    #[test]
    fn test_tasks_run_on_next_frame_in_order() {
        let mut editor = Editor::new(EditorOptions::default(), Vec::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in ["a", "b"] {
            let log = log.clone();
            editor.schedule_frame("test", Box::new(move |_| log.borrow_mut().push(name)));
        }
        assert!(log.borrow().is_empty());
        assert_eq!(editor.run_animation_frame(), 2);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
        assert_eq!(editor.scheduler().pending_count(), 0);
    }

    #[test]
    fn test_cancelled_task_never_runs() {
        let mut editor = Editor::new(EditorOptions::default(), Vec::new());
        let ran = Rc::new(RefCell::new(false));
        let flag = ran.clone();
        let id = editor.schedule_frame("test", Box::new(move |_| *flag.borrow_mut() = true));
        assert!(editor.cancel_frame_task(id));
        assert!(!editor.cancel_frame_task(id));
        editor.run_pending_frames();
        assert!(!*ran.borrow());
    }

    #[test]
    fn test_task_scheduled_from_task_waits_a_frame() {
        let mut editor = Editor::new(EditorOptions::default(), Vec::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        let outer = log.clone();
        editor.schedule_frame(
            "outer",
            Box::new(move |editor| {
                outer.borrow_mut().push(editor.scheduler().current_frame());
                let inner = outer.clone();
                editor.schedule_frame(
                    "inner",
                    Box::new(move |editor| inner.borrow_mut().push(editor.scheduler().current_frame())),
                );
            }),
        );
        assert_eq!(editor.run_pending_frames(), 2);
        assert_eq!(*log.borrow(), vec![1, 2]);
    }
}
