// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! An in-memory [`Host`] for exercising the driver without touching the real
//! file system or launching real processes. Timestamps are fabricated,
//! spawns are scripted, and the "children" can materialize the output files
//! the real tool would have written, which is enough to test freshness
//! decisions end to end.

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, VecDeque},
    ffi::OsString,
    io,
    path::{Component, Path, PathBuf},
};

use host_abstraction_layer::{ExitVerdict, FileKind, Host, Mtime, ProcessHandle, Redirects};

#[derive(Clone)]
struct Node {
    kind: FileKind,
    mtime: Mtime,
    data: Vec<u8>,
}

/// What the next scripted child process does when it is waited on: its
/// verdict, plus the files "the tool" leaves behind.
pub struct PlannedExit {
    verdict: ExitVerdict,
    creates: Vec<(PathBuf, u64)>,
}

impl PlannedExit {
    pub fn exit(code: i32) -> PlannedExit {
        PlannedExit {
            verdict: ExitVerdict::Exited(code),
            creates: Vec::new(),
        }
    }

    pub fn signal(signal: i32) -> PlannedExit {
        PlannedExit {
            verdict: ExitVerdict::Signaled(signal),
            creates: Vec::new(),
        }
    }

    /// Declares a file this process creates on completion, with the given
    /// fabricated modification time.
    pub fn creates(mut self, path: impl Into<PathBuf>, mtime_seconds: u64) -> PlannedExit {
        self.creates.push((path.into(), mtime_seconds));
        self
    }
}

/// See the module docs. Spawns without a matching [`TestHost::plan_process`]
/// succeed with exit status 0 and create nothing.
pub struct TestHost {
    tree: RefCell<BTreeMap<PathBuf, Node>>,
    env: RefCell<BTreeMap<String, OsString>>,
    plans: RefCell<VecDeque<PlannedExit>>,
    running: RefCell<BTreeMap<u64, PlannedExit>>,
    spawned: RefCell<Vec<String>>,
    next_handle: Cell<u64>,
    clock_seconds: Cell<u64>,
}

impl Default for TestHost {
    fn default() -> TestHost {
        TestHost {
            tree: RefCell::new(BTreeMap::new()),
            env: RefCell::new(BTreeMap::new()),
            plans: RefCell::new(VecDeque::new()),
            running: RefCell::new(BTreeMap::new()),
            spawned: RefCell::new(Vec::new()),
            next_handle: Cell::new(0),
            // Writes through the Host interface get timestamps far above the
            // small fixture values tests hand to add_file.
            clock_seconds: Cell::new(1_000_000),
        }
    }
}

impl TestHost {
    pub fn new() -> TestHost {
        TestHost::default()
    }

    pub fn add_dir(&self, path: impl Into<PathBuf>) {
        self.insert(path.into(), FileKind::Directory, 0, Vec::new());
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, mtime_seconds: u64) {
        self.insert(path.into(), FileKind::Regular, mtime_seconds, Vec::new());
    }

    pub fn add_file_with_data(&self, path: impl Into<PathBuf>, mtime_seconds: u64, data: &[u8]) {
        self.insert(path.into(), FileKind::Regular, mtime_seconds, data.to_vec());
    }

    pub fn add_symlink(&self, path: impl Into<PathBuf>) {
        self.insert(path.into(), FileKind::Symlink, 0, Vec::new());
    }

    /// Adds an entry of [`FileKind::Other`] (socket, device node, ...).
    pub fn add_other(&self, path: impl Into<PathBuf>) {
        self.insert(path.into(), FileKind::Other, 0, Vec::new());
    }

    pub fn set_env(&self, name: &str, value: &str) {
        self.env
            .borrow_mut()
            .insert(name.to_string(), OsString::from(value));
    }

    /// Scripts the next spawned process. Plans are consumed in spawn order.
    pub fn plan_process(&self, plan: PlannedExit) {
        self.plans.borrow_mut().push_back(plan);
    }

    /// Every spawned command so far, rendered as space-separated argv lines.
    pub fn spawned_commands(&self) -> Vec<String> {
        self.spawned.borrow().clone()
    }

    /// How many spawned processes have not been waited on. Zero after a
    /// correctly drained batch; anything else is a leaked handle.
    pub fn running_count(&self) -> usize {
        self.running.borrow().len()
    }

    pub fn file_data(&self, path: &Path) -> Option<Vec<u8>> {
        self.tree
            .borrow()
            .get(&normalize(path))
            .map(|node| node.data.clone())
    }

    fn insert(&self, path: PathBuf, kind: FileKind, mtime_seconds: u64, data: Vec<u8>) {
        self.tree.borrow_mut().insert(
            normalize(&path),
            Node {
                kind,
                mtime: Mtime::from_unix_seconds(mtime_seconds),
                data,
            },
        );
    }

    fn tick(&self) -> u64 {
        let now = self.clock_seconds.get() + 1;
        self.clock_seconds.set(now);
        now
    }

    fn node(&self, path: &Path) -> io::Result<Node> {
        self.tree
            .borrow()
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    /// Checks that the parent directory of `path` exists (the tree root
    /// always does).
    fn check_parent(&self, path: &Path) -> io::Result<()> {
        let norm = normalize(path);
        match norm.parent() {
            None => Ok(()),
            Some(parent) if parent.as_os_str().is_empty() => Ok(()),
            Some(parent) => match self.tree.borrow().get(parent) {
                Some(node) if node.kind == FileKind::Directory => Ok(()),
                _ => Err(not_found(parent)),
            },
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}

impl Host for TestHost {
    fn file_exists(&self, path: &Path) -> io::Result<bool> {
        Ok(self.tree.borrow().contains_key(&normalize(path)))
    }

    fn file_kind(&self, path: &Path) -> io::Result<FileKind> {
        Ok(self.node(path)?.kind)
    }

    fn mtime(&self, path: &Path) -> io::Result<Mtime> {
        Ok(self.node(path)?.mtime)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        if self.tree.borrow().contains_key(&normalize(path)) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("entry already exists: {}", path.display()),
            ));
        }
        self.check_parent(path)?;
        let mtime = self.tick();
        self.insert(path.to_path_buf(), FileKind::Directory, mtime, Vec::new());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        // Single-node move: good enough for the file renames the driver
        // performs (directory renames would leave children behind).
        let node = self
            .tree
            .borrow_mut()
            .remove(&normalize(from))
            .ok_or_else(|| not_found(from))?;
        self.tree.borrow_mut().insert(normalize(to), node);
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> io::Result<()> {
        let mut tree = self.tree.borrow_mut();
        let norm = normalize(path);
        match tree.get(&norm) {
            None => Err(not_found(path)),
            Some(node) if node.kind == FileKind::Directory => {
                Err(io::Error::other(format!("is a directory: {}", path.display())))
            }
            Some(_) => {
                tree.remove(&norm);
                Ok(())
            }
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let norm = normalize(path);
        match self.node(path)?.kind {
            FileKind::Directory => {}
            _ => return Err(io::Error::other(format!("not a directory: {}", path.display()))),
        }
        let names = self
            .tree
            .borrow()
            .keys()
            .filter(|key| key.parent() == Some(norm.as_path()))
            .map(|key| {
                key.file_name()
                    .and_then(|name| name.to_str())
                    .expect("TestHost entries have Unicode names")
                    .to_string()
            })
            .collect();
        Ok(names)
    }

    fn read_file(&self, path: &Path, into: &mut Vec<u8>) -> io::Result<()> {
        let node = self.node(path)?;
        match node.kind {
            FileKind::Regular => {
                into.extend_from_slice(&node.data);
                Ok(())
            }
            _ => Err(io::Error::other(format!("not a regular file: {}", path.display()))),
        }
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.check_parent(path)?;
        let mtime = self.tick();
        self.insert(path.to_path_buf(), FileKind::Regular, mtime, data.to_vec());
        Ok(())
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let node = self.node(src)?;
        match node.kind {
            FileKind::Regular => {}
            _ => return Err(io::Error::other(format!("not a regular file: {}", src.display()))),
        }
        self.check_parent(dst)?;
        let mtime = self.tick();
        self.insert(dst.to_path_buf(), FileKind::Regular, mtime, node.data);
        Ok(())
    }

    fn env_var(&self, name: &str) -> Option<OsString> {
        self.env.borrow().get(name).cloned()
    }

    fn spawn(&self, argv: &[OsString], _redirects: Redirects) -> io::Result<ProcessHandle> {
        if argv.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot spawn an empty command",
            ));
        }
        let rendered = argv
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<String>>()
            .join(" ");
        self.spawned.borrow_mut().push(rendered);

        let plan = self
            .plans
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| PlannedExit::exit(0));
        let id = self.next_handle.get();
        self.next_handle.set(id + 1);
        self.running.borrow_mut().insert(id, plan);
        Ok(ProcessHandle::new(id))
    }

    fn wait(&self, handle: ProcessHandle) -> io::Result<ExitVerdict> {
        let plan = self
            .running
            .borrow_mut()
            .remove(&handle.inner())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "unknown or already-completed process handle",
                )
            })?;
        for (path, mtime_seconds) in &plan.creates {
            self.insert(path.clone(), FileKind::Regular, *mtime_seconds, Vec::new());
        }
        Ok(plan.verdict)
    }
}
