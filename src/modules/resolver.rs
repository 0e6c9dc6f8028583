use std::{
    cell::RefCell,
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    ast::{
        ast::{Program, Stmt},
        statements::{FnDecl, GlobalDecl, StructDecl, UseStmt},
    },
    errors::errors::{Error, ErrorImpl},
    lexer::lexer::tokenize,
    parser::parser::parse,
    Position,
};

/// A top level declaration visible to importers.
#[derive(Debug, Clone)]
pub enum Export {
    Func(FnDecl),
    Struct(StructDecl),
    Var(GlobalDecl),
    /// A member of a directory module, named by its full dotted path.
    Module(Vec<String>),
}

impl Export {
    pub fn kind(&self) -> &'static str {
        match self {
            Export::Func(_) => "func",
            Export::Struct(_) => "struct",
            Export::Var(_) => "var",
            Export::Module(_) => "module",
        }
    }
}

/// A parsed module file, or a directory of modules.
#[derive(Debug)]
pub struct Module {
    /// Dotted path the module was first imported as.
    pub name: String,
    /// Canonical location on disk.
    pub path: PathBuf,
    /// `None` for directory modules.
    pub program: Option<Program>,
    pub exports: IndexMap<String, Export>,
    pub imports: Vec<Rc<UseStmt>>,
}

impl Module {
    pub fn is_directory(&self) -> bool {
        self.program.is_none()
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &FnDecl> {
        self.exports.values().filter_map(|export| match export {
            Export::Func(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn structs(&self) -> impl Iterator<Item = &StructDecl> {
        self.exports.values().filter_map(|export| match export {
            Export::Struct(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn globals(&self) -> impl Iterator<Item = &GlobalDecl> {
        self.exports.values().filter_map(|export| match export {
            Export::Var(decl) => Some(decl),
            _ => None,
        })
    }

    fn from_program(name: String, path: PathBuf, program: Program) -> Module {
        let mut exports = IndexMap::new();
        let mut imports = vec![];

        for stmt in program.body.iter() {
            match stmt {
                Stmt::FnDecl(decl) => {
                    exports.insert(decl.identifier.clone(), Export::Func(Rc::clone(decl)));
                }
                Stmt::StructDecl(decl) => {
                    exports.insert(decl.identifier.clone(), Export::Struct(Rc::clone(decl)));
                }
                Stmt::GlobalDecl(decl) => {
                    exports.insert(decl.identifier.clone(), Export::Var(Rc::clone(decl)));
                }
                Stmt::Use(use_stmt) => imports.push(Rc::clone(use_stmt)),
                _ => {}
            }
        }

        Module {
            name,
            path,
            program: Some(program),
            exports,
            imports,
        }
    }
}

/// Locates, parses and caches modules. One instance is shared by the type
/// checker and the evaluator, so every file is read and parsed once per run.
#[derive(Debug)]
pub struct ModuleResolver {
    base_path: PathBuf,
    stdlib_path: Option<PathBuf>,
    cache: RefCell<HashMap<PathBuf, Rc<Module>>>,
}

impl ModuleResolver {
    pub fn new(base_path: PathBuf, stdlib_path: Option<PathBuf>) -> Self {
        ModuleResolver {
            base_path,
            stdlib_path,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Search order: `<base>/a/b.nx`, `<base>/a/b/`, `<stdlib>/a/b.nx`, `<stdlib>/a/b/`.
    pub fn locate(&self, path: &[String]) -> Option<PathBuf> {
        let relative: PathBuf = path.iter().collect();

        let mut roots = vec![self.base_path.as_path()];
        if let Some(stdlib) = self.stdlib_path.as_deref() {
            roots.push(stdlib);
        }

        for root in roots {
            let file = root.join(&relative).with_extension("nx");
            if file.is_file() {
                return Some(file);
            }

            let directory = root.join(&relative);
            if directory.is_dir() {
                return Some(directory);
            }
        }

        None
    }

    /// Resolves a dotted module path, loading and caching it on first use.
    pub fn resolve(&self, path: &[String], position: &Position) -> Result<Rc<Module>, Error> {
        let dotted = path.join(".");

        let Some(location) = self.locate(path) else {
            return Err(Error::new(
                ErrorImpl::ModuleNotFound { path: dotted },
                position.clone(),
            ));
        };

        let canonical = fs::canonicalize(&location).unwrap_or(location);
        if let Some(module) = self.cache.borrow().get(&canonical) {
            debug!("Module cache hit for `{}` ({})", dotted, canonical.display());
            return Ok(Rc::clone(module));
        }

        let module = if canonical.is_dir() {
            self.load_directory(path, &canonical, position)?
        } else {
            self.load_file(dotted, &canonical, position)?
        };

        let module = Rc::new(module);
        self.cache
            .borrow_mut()
            .insert(canonical, Rc::clone(&module));

        Ok(module)
    }

    fn load_file(&self, dotted: String, file: &Path, position: &Position) -> Result<Module, Error> {
        debug!("Loading module `{}` from {}", dotted, file.display());

        let file_name = file.to_string_lossy().to_string();
        let source = fs::read_to_string(file).map_err(|err| {
            Error::new(
                ErrorImpl::ModuleReadError {
                    path: file_name.clone(),
                    message: err.to_string(),
                },
                position.clone(),
            )
        })?;

        let tokens = tokenize(source, Some(file_name.clone()))?;
        let program = parse(tokens, Rc::new(file_name))?;

        Ok(Module::from_program(dotted, file.to_path_buf(), program))
    }

    /// A directory exports one sub-module per `.nx` file and per subdirectory.
    fn load_directory(
        &self,
        path: &[String],
        directory: &Path,
        position: &Position,
    ) -> Result<Module, Error> {
        let dotted = path.join(".");
        debug!("Loading directory module `{}` from {}", dotted, directory.display());

        let entries = fs::read_dir(directory).map_err(|err| {
            Error::new(
                ErrorImpl::ModuleReadError {
                    path: directory.to_string_lossy().to_string(),
                    message: err.to_string(),
                },
                position.clone(),
            )
        })?;

        let mut members: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let entry_path = entry.path();
                if entry_path.is_dir() {
                    entry_path.file_name().map(|name| name.to_string_lossy().to_string())
                } else if entry_path.extension().is_some_and(|extension| extension == "nx") {
                    entry_path.file_stem().map(|name| name.to_string_lossy().to_string())
                } else {
                    None
                }
            })
            .collect();
        members.sort();
        members.dedup();

        let exports = members
            .into_iter()
            .map(|member| {
                let mut member_path = path.to_vec();
                member_path.push(member.clone());
                (member, Export::Module(member_path))
            })
            .collect();

        Ok(Module {
            name: dotted,
            path: directory.to_path_buf(),
            program: None,
            exports,
            imports: vec![],
        })
    }
}
