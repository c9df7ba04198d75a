//! Remote Python programs behind each filesystem operation.
//!
//! All generators are pure; paths are embedded through [`py_str`] so quotes
//! and backslashes in names cannot break out of the literal.

use rawrepl_session::protocol::FILE_CHUNK_SIZE;

const IMPORT_OS: &str = "\
try:
    import os
except ImportError:
    import uos as os
";

const LISTDIR_FLAT: &str = "\
def listdir(directory):
    if directory == '/':
        return sorted([directory + f for f in os.listdir(directory)])
    return sorted([directory + '/' + f for f in os.listdir(directory)])
";

// Files are confirmed with stat(); empty directories are leaves too.
const LISTDIR_RECURSIVE: &str = "\
def listdir(directory):
    result = set()
    def _listdir(path):
        try:
            children = os.listdir(path)
        except OSError:
            os.stat(path)
            result.add(path)
        else:
            if children:
                for child in children:
                    if path == '/':
                        _listdir(path + child)
                    else:
                        _listdir(path + '/' + child)
            else:
                result.add(path)
    _listdir(directory)
    return sorted(result)
";

const RMDIR_RECURSIVE: &str = "\
def rmdir(directory):
    os.chdir(directory)
    for f in os.listdir():
        try:
            os.remove(f)
        except OSError:
            pass
    for f in os.listdir():
        rmdir(f)
    os.chdir('..')
    os.rmdir(directory)
";

/// Closes the file opened by [`open_for_write`].
pub const CLOSE_FILE: &str = "f.close()";

/// Quote `value` as a single-quoted Python string literal.
pub fn py_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Encode `data` as a Python bytes literal.
///
/// Printable ASCII is kept as is; everything else becomes `\xNN`.
pub fn py_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() + 3);
    out.push_str("b'");
    for &byte in data {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            0x20..=0x7e => out.push(char::from(byte)),
            _ => out.push_str(&format!("\\x{byte:02x}")),
        }
    }
    out.push('\'');
    out
}

/// Print the file at `path` as hex, reading it in small chunks.
pub fn get(path: &str) -> String {
    format!(
        "\
import sys
try:
    import ubinascii as binascii
except ImportError:
    import binascii
with open({path}, 'rb') as infile:
    while True:
        chunk = infile.read({FILE_CHUNK_SIZE})
        if chunk == b'':
            break
        sys.stdout.write(binascii.hexlify(chunk).decode())
",
        path = py_str(path),
    )
}

/// Print the entries under `dir` as a Python list of strings.
pub fn ls(dir: &str, long: bool, recursive: bool) -> String {
    let mut code = String::from(IMPORT_OS);
    code.push_str(if recursive {
        LISTDIR_RECURSIVE
    } else {
        LISTDIR_FLAT
    });

    let dir = py_str(dir);
    if long {
        code.push_str(&format!(
            "\
r = []
for f in listdir({dir}):
    size = os.stat(f)[6]
    r.append('{{0}} - {{1}} bytes'.format(f, size))
print(r)
"
        ));
    } else {
        code.push_str(&format!("print(listdir({dir}))\n"));
    }
    code
}

pub fn mkdir(dir: &str) -> String {
    format!("{IMPORT_OS}os.mkdir({})\n", py_str(dir))
}

pub fn rm(path: &str) -> String {
    format!("{IMPORT_OS}os.remove({})\n", py_str(path))
}

/// Remove `dir` with everything below it. Entries that fail to delete
/// are skipped.
pub fn rmdir(dir: &str) -> String {
    format!("{IMPORT_OS}{RMDIR_RECURSIVE}rmdir({})\n", py_str(dir))
}

/// Open `path` for binary writing as the remote global `f`.
pub fn open_for_write(path: &str) -> String {
    format!("f = open({}, 'wb')", py_str(path))
}

/// Append `chunk` to the file opened by [`open_for_write`].
pub fn write_chunk(chunk: &[u8]) -> String {
    format!("f.write({})", py_bytes(chunk))
}
