use {
    crate::{erase::Erasable, Model},
    lincheck::LinearizationInfo,
    std::{
        io::{self, Write},
        path::Path,
    },
};

/// Renders `info`, as produced by a verbose check of a history against `model`, as a
/// self-contained HTML page written to `output`. Errors from `output` are returned unchanged.
pub fn visualize<S, I, O>(
    model: &Model<S, I, O>,
    info: &LinearizationInfo,
    output: impl Write,
) -> io::Result<()>
where
    S: Erasable,
    I: Erasable,
    O: Erasable,
{
    lincheck::visualize(&model.to_model(), info, output)
}

/// Like [`visualize`], but creates (or truncates) the file at `path`.
pub fn visualize_path<S, I, O>(
    model: &Model<S, I, O>,
    info: &LinearizationInfo,
    path: impl AsRef<Path>,
) -> io::Result<()>
where
    S: Erasable,
    I: Erasable,
    O: Erasable,
{
    lincheck::visualize_path(&model.to_model(), info, path)
}
