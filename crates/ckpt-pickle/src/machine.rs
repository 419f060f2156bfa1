use std::collections::HashMap;

use crate::allowlist::AllowedGlobal;
use crate::error::{PickleError, PickleResult};
use crate::value::{StorageHandle, Value};

/// Pickle opcodes this interpreter accepts. Anything else is a hard stop.
mod op {
    // Protocol / control
    pub const PROTO: u8 = 0x80;
    pub const FRAME: u8 = 0x95;
    pub const STOP: u8 = b'.';

    // Literals
    pub const NONE: u8 = b'N';
    pub const NEWTRUE: u8 = 0x88;
    pub const NEWFALSE: u8 = 0x89;
    pub const INT: u8 = b'I';
    pub const BININT: u8 = b'J';
    pub const BININT1: u8 = b'K';
    pub const BININT2: u8 = b'M';
    pub const LONG: u8 = b'L';
    pub const LONG1: u8 = 0x8a;
    pub const LONG4: u8 = 0x8b;
    pub const FLOAT: u8 = b'F';
    pub const BINFLOAT: u8 = b'G';
    pub const STRING: u8 = b'S';
    pub const BINSTRING: u8 = b'T';
    pub const SHORT_BINSTRING: u8 = b'U';
    pub const UNICODE: u8 = b'V';
    pub const BINUNICODE: u8 = b'X';
    pub const SHORT_BINUNICODE: u8 = 0x8c;
    pub const BINUNICODE8: u8 = 0x8d;
    pub const BINBYTES: u8 = b'B';
    pub const SHORT_BINBYTES: u8 = b'C';
    pub const BINBYTES8: u8 = 0x8e;

    // Collections
    pub const MARK: u8 = b'(';
    pub const EMPTY_TUPLE: u8 = b')';
    pub const TUPLE: u8 = b't';
    pub const TUPLE1: u8 = 0x85;
    pub const TUPLE2: u8 = 0x86;
    pub const TUPLE3: u8 = 0x87;
    pub const EMPTY_LIST: u8 = b']';
    pub const LIST: u8 = b'l';
    pub const APPEND: u8 = b'a';
    pub const APPENDS: u8 = b'e';
    pub const EMPTY_DICT: u8 = b'}';
    pub const DICT: u8 = b'd';
    pub const SETITEM: u8 = b's';
    pub const SETITEMS: u8 = b'u';
    pub const EMPTY_SET: u8 = 0x8f;
    pub const FROZENSET: u8 = 0x91;
    pub const ADDITEMS: u8 = 0x90;

    // Memo
    pub const PUT: u8 = b'p';
    pub const BINPUT: u8 = b'q';
    pub const LONG_BINPUT: u8 = b'r';
    pub const MEMOIZE: u8 = 0x94;
    pub const GET: u8 = b'g';
    pub const BINGET: u8 = b'h';
    pub const LONG_BINGET: u8 = b'j';

    // Construction
    pub const GLOBAL: u8 = b'c';
    pub const STACK_GLOBAL: u8 = 0x93;
    pub const REDUCE: u8 = b'R';
    pub const NEWOBJ: u8 = 0x81;
    pub const NEWOBJ_EX: u8 = 0x92;
    pub const BUILD: u8 = b'b';

    // Persistence
    pub const PERSID: u8 = b'P';
    pub const BINPERSID: u8 = b'Q';
}

/// Highest pickle protocol version PROTO may announce.
const HIGHEST_PROTOCOL: u8 = 5;

/// The single recognized persistent-reference tag.
const STORAGE_TAG: &str = "storage";

/// A stack machine over pickle bytecode that builds [`Value`] trees instead
/// of live objects.
///
/// Global resolution goes through [`AllowedGlobal::resolve`]; a miss aborts
/// the stream. Persistent references become [`StorageHandle`] placeholders
/// without any shard bytes being read. The read cursor survives across
/// [`RestrictedUnpickler::load`] calls so a legacy checkpoint's consecutive
/// top-level objects share one machine; memo and stack state do not.
pub struct RestrictedUnpickler<'a> {
    data: &'a [u8],
    pos: usize,
    stack: Vec<Value>,
    /// Stack depths at which MARK opcodes were pushed.
    marks: Vec<usize>,
    memo: HashMap<u32, Value>,
}

impl<'a> RestrictedUnpickler<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            stack: Vec::new(),
            marks: Vec::new(),
            memo: HashMap::new(),
        }
    }

    /// Current read offset into the stream.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// `true` once every byte of the stream has been consumed.
    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Interpret one top-level object, consuming bytes up to and including
    /// its STOP opcode.
    ///
    /// Each top-level object is an independent program: producers restart
    /// memo ids per object, so memo and stack state reset here while the
    /// byte cursor carries on.
    pub fn load(&mut self) -> PickleResult<Value> {
        self.stack.clear();
        self.marks.clear();
        self.memo.clear();
        loop {
            let offset = self.pos;
            let opcode = self.read_u8()?;
            match opcode {
                op::PROTO => {
                    let version = self.read_u8()?;
                    if version > HIGHEST_PROTOCOL {
                        return Err(PickleError::UnsupportedProtocol(version));
                    }
                }
                op::FRAME => {
                    // Frame length is advisory; we read the stream linearly.
                    self.read_u64le()?;
                }
                op::STOP => return self.pop(),

                op::NONE => self.stack.push(Value::None),
                op::NEWTRUE => self.stack.push(Value::Bool(true)),
                op::NEWFALSE => self.stack.push(Value::Bool(false)),
                op::INT => {
                    let line = self.read_line()?;
                    // Protocol 0 spells booleans as INT 01 / INT 00.
                    let value = match line {
                        "01" => Value::Bool(true),
                        "00" => Value::Bool(false),
                        text => Value::Int(text.parse().map_err(|_| {
                            PickleError::malformed(offset, format!("bad INT literal '{text}'"))
                        })?),
                    };
                    self.stack.push(value);
                }
                op::BININT => {
                    let n = self.read_i32le()?;
                    self.stack.push(Value::Int(i64::from(n)));
                }
                op::BININT1 => {
                    let n = self.read_u8()?;
                    self.stack.push(Value::Int(i64::from(n)));
                }
                op::BININT2 => {
                    let n = self.read_u16le()?;
                    self.stack.push(Value::Int(i64::from(n)));
                }
                op::LONG => {
                    let line = self.read_line()?;
                    let text = line.strip_suffix('L').unwrap_or(line);
                    let n: i64 = text.parse().map_err(|_| {
                        PickleError::malformed(offset, format!("bad LONG literal '{text}'"))
                    })?;
                    self.stack.push(Value::Int(n));
                }
                op::LONG1 => {
                    let len = self.read_u8()? as usize;
                    let bytes = self.take(len)?;
                    self.stack.push(long_value(bytes));
                }
                op::LONG4 => {
                    let len = self.read_len_u32()?;
                    let bytes = self.take(len)?;
                    self.stack.push(long_value(bytes));
                }
                op::FLOAT => {
                    let line = self.read_line()?;
                    let x: f64 = line.parse().map_err(|_| {
                        PickleError::malformed(offset, format!("bad FLOAT literal '{line}'"))
                    })?;
                    self.stack.push(Value::Float(x));
                }
                op::BINFLOAT => {
                    let bytes = self.take(8)?;
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(bytes);
                    // BINFLOAT is the one big-endian operand in the protocol.
                    self.stack.push(Value::Float(f64::from_be_bytes(buf)));
                }

                op::SHORT_BINSTRING => {
                    let len = self.read_u8()? as usize;
                    let s = self.take_utf8(len, offset)?;
                    self.stack.push(Value::Str(s.to_string()));
                }
                op::BINSTRING => {
                    let n = self.read_i32le()?;
                    let len = usize::try_from(n).map_err(|_| {
                        PickleError::malformed(offset, "negative BINSTRING length")
                    })?;
                    let s = self.take_utf8(len, offset)?;
                    self.stack.push(Value::Str(s.to_string()));
                }
                op::STRING => {
                    let line = self.read_line()?;
                    let s = unquote(line)
                        .ok_or_else(|| PickleError::malformed(offset, "bad STRING literal"))?;
                    self.stack.push(Value::Str(s));
                }
                op::BINUNICODE => {
                    let len = self.read_len_u32()?;
                    let s = self.take_utf8(len, offset)?;
                    self.stack.push(Value::Str(s.to_string()));
                }
                op::SHORT_BINUNICODE => {
                    let len = self.read_u8()? as usize;
                    let s = self.take_utf8(len, offset)?;
                    self.stack.push(Value::Str(s.to_string()));
                }
                op::BINUNICODE8 => {
                    let len = self.read_len_u64(offset)?;
                    let s = self.take_utf8(len, offset)?;
                    self.stack.push(Value::Str(s.to_string()));
                }
                op::UNICODE => {
                    let line = self.read_line()?;
                    self.stack.push(Value::Str(line.to_string()));
                }
                op::BINBYTES => {
                    let len = self.read_len_u32()?;
                    let bytes = self.take(len)?;
                    self.stack.push(Value::Bytes(bytes.to_vec()));
                }
                op::SHORT_BINBYTES => {
                    let len = self.read_u8()? as usize;
                    let bytes = self.take(len)?;
                    self.stack.push(Value::Bytes(bytes.to_vec()));
                }
                op::BINBYTES8 => {
                    let len = self.read_len_u64(offset)?;
                    let bytes = self.take(len)?;
                    self.stack.push(Value::Bytes(bytes.to_vec()));
                }

                op::MARK => self.marks.push(self.stack.len()),
                op::EMPTY_TUPLE => self.stack.push(Value::Tuple(Vec::new())),
                op::TUPLE => {
                    let items = self.pop_mark()?;
                    self.stack.push(Value::Tuple(items));
                }
                op::TUPLE1 => {
                    let a = self.pop()?;
                    self.stack.push(Value::Tuple(vec![a]));
                }
                op::TUPLE2 => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.stack.push(Value::Tuple(vec![a, b]));
                }
                op::TUPLE3 => {
                    let c = self.pop()?;
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.stack.push(Value::Tuple(vec![a, b, c]));
                }
                op::EMPTY_LIST => self.stack.push(Value::List(Vec::new())),
                op::LIST => {
                    let items = self.pop_mark()?;
                    self.stack.push(Value::List(items));
                }
                op::APPEND => {
                    let item = self.pop()?;
                    self.top_list(offset)?.push(item);
                }
                op::APPENDS => {
                    let items = self.pop_mark()?;
                    self.top_list(offset)?.extend(items);
                }
                op::EMPTY_DICT => self.stack.push(Value::Dict(Vec::new())),
                op::DICT => {
                    let items = self.pop_mark()?;
                    let pairs = into_pairs(items)
                        .ok_or_else(|| PickleError::malformed(offset, "odd DICT item count"))?;
                    self.stack.push(Value::Dict(pairs));
                }
                op::SETITEM => {
                    let value = self.pop()?;
                    let key = self.pop()?;
                    self.top_dict(offset)?.push((key, value));
                }
                op::SETITEMS => {
                    let items = self.pop_mark()?;
                    let pairs = into_pairs(items)
                        .ok_or_else(|| PickleError::malformed(offset, "odd SETITEMS item count"))?;
                    self.top_dict(offset)?.extend(pairs);
                }
                op::EMPTY_SET => self.stack.push(Value::Set(Vec::new())),
                op::FROZENSET => {
                    let items = self.pop_mark()?;
                    self.stack.push(Value::Set(items));
                }
                op::ADDITEMS => {
                    let items = self.pop_mark()?;
                    match self.top_mut(offset)? {
                        Value::Set(set) => set.extend(items),
                        other => {
                            return Err(PickleError::malformed(
                                offset,
                                format!("ADDITEMS target is {}, not set", other.type_name()),
                            ))
                        }
                    }
                }

                op::PUT => {
                    let line = self.read_line()?;
                    let id: u32 = line.parse().map_err(|_| {
                        PickleError::malformed(offset, format!("bad PUT index '{line}'"))
                    })?;
                    self.memo_put(id, offset)?;
                }
                op::BINPUT => {
                    let id = u32::from(self.read_u8()?);
                    self.memo_put(id, offset)?;
                }
                op::LONG_BINPUT => {
                    let id = self.read_u32le()?;
                    self.memo_put(id, offset)?;
                }
                op::MEMOIZE => {
                    let id = self.memo.len() as u32;
                    self.memo_put(id, offset)?;
                }
                op::GET => {
                    let line = self.read_line()?;
                    let id: u32 = line.parse().map_err(|_| {
                        PickleError::malformed(offset, format!("bad GET index '{line}'"))
                    })?;
                    self.memo_get(id)?;
                }
                op::BINGET => {
                    let id = u32::from(self.read_u8()?);
                    self.memo_get(id)?;
                }
                op::LONG_BINGET => {
                    let id = self.read_u32le()?;
                    self.memo_get(id)?;
                }

                op::GLOBAL => {
                    let module = self.read_line()?.to_string();
                    let name = self.read_line()?.to_string();
                    let global = resolve_global(&module, &name)?;
                    self.stack.push(Value::Global(global));
                }
                op::STACK_GLOBAL => {
                    let name = self.pop()?;
                    let module = self.pop()?;
                    match (module.as_str(), name.as_str()) {
                        (Some(module), Some(name)) => {
                            let global = resolve_global(module, name)?;
                            self.stack.push(Value::Global(global));
                        }
                        _ => {
                            return Err(PickleError::malformed(
                                offset,
                                "STACK_GLOBAL operands must be strings",
                            ))
                        }
                    }
                }
                op::REDUCE => {
                    let args = self.pop_args_tuple(offset)?;
                    let ctor = self.pop_callable(offset)?;
                    self.stack.push(apply_constructor(ctor, args));
                }
                op::NEWOBJ => {
                    let args = self.pop_args_tuple(offset)?;
                    let ctor = self.pop_callable(offset)?;
                    self.stack.push(apply_constructor(ctor, args));
                }
                op::NEWOBJ_EX => {
                    match self.pop()? {
                        Value::Dict(_) => {}
                        other => {
                            return Err(PickleError::malformed(
                                offset,
                                format!("NEWOBJ_EX kwargs are {}, not dict", other.type_name()),
                            ))
                        }
                    }
                    let args = self.pop_args_tuple(offset)?;
                    let ctor = self.pop_callable(offset)?;
                    self.stack.push(apply_constructor(ctor, args));
                }
                op::BUILD => {
                    // Any forbidden symbol inside the state was already
                    // refused while the state was built, so discarding it
                    // here loses nothing the validator cares about.
                    let _state = self.pop()?;
                }

                op::PERSID => {
                    // Text-form pids never carry the storage tag tuple.
                    let pid = self.read_line()?.to_string();
                    let resolved = self.persistent_load(Value::Str(pid), offset)?;
                    self.stack.push(resolved);
                }
                op::BINPERSID => {
                    let pid = self.pop()?;
                    let resolved = self.persistent_load(pid, offset)?;
                    self.stack.push(resolved);
                }

                other => {
                    return Err(PickleError::UnknownOpcode {
                        opcode: other,
                        offset,
                    })
                }
            }
        }
    }

    /// Resolve a persistent reference into a [`StorageHandle`] placeholder.
    ///
    /// The only recognized shape is the external-storage tuple
    /// `("storage", <storage type>, <key>, <location>, <element count>)`,
    /// optionally followed by a sixth view-metadata element as emitted by
    /// older serializers. Any other tag is forbidden content; a storage
    /// tuple of the wrong shape is a format error.
    fn persistent_load(&self, pid: Value, offset: usize) -> PickleResult<Value> {
        let items = match pid {
            Value::Tuple(items) => items,
            other => {
                return Err(PickleError::ForbiddenPersistentTag(
                    other.type_name().to_string(),
                ))
            }
        };
        let tag = match items.first().and_then(Value::as_str) {
            Some(tag) => tag,
            None => return Err(PickleError::ForbiddenPersistentTag("<non-string>".into())),
        };
        if tag != STORAGE_TAG {
            return Err(PickleError::ForbiddenPersistentTag(tag.to_string()));
        }
        if items.len() != 5 && items.len() != 6 {
            return Err(PickleError::malformed(
                offset,
                format!(
                    "storage reference has {} elements, expected 5 or 6",
                    items.len()
                ),
            ));
        }
        if let Some(view) = items.get(5) {
            match view {
                Value::None | Value::Tuple(_) => {}
                other => {
                    return Err(PickleError::malformed(
                        offset,
                        format!("storage view metadata is {}", other.type_name()),
                    ))
                }
            }
        }
        let kind = match &items[1] {
            Value::Global(global) => global.storage_kind().ok_or_else(|| {
                PickleError::malformed(offset, "storage reference type is not a storage marker")
            })?,
            other => {
                return Err(PickleError::malformed(
                    offset,
                    format!("storage reference type is {}", other.type_name()),
                ))
            }
        };
        let key = items[2]
            .as_str()
            .ok_or_else(|| PickleError::malformed(offset, "storage key must be a string"))?
            .to_string();
        items[3]
            .as_str()
            .ok_or_else(|| PickleError::malformed(offset, "storage location must be a string"))?;
        let numel = items[4]
            .as_int()
            .ok_or_else(|| PickleError::malformed(offset, "storage element count must be an int"))?;
        let numel = u64::try_from(numel).map_err(|_| {
            PickleError::malformed(offset, "storage element count must be non-negative")
        })?;
        Ok(Value::Storage(StorageHandle { kind, numel, key }))
    }

    // --- stack discipline -------------------------------------------------

    /// Stack depth below which pops may not reach (protects open marks).
    fn floor(&self) -> usize {
        self.marks.last().copied().unwrap_or(0)
    }

    fn pop(&mut self) -> PickleResult<Value> {
        if self.stack.len() <= self.floor() {
            return Err(PickleError::StackUnderflow(self.pos));
        }
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(PickleError::StackUnderflow(self.pos)),
        }
    }

    fn pop_mark(&mut self) -> PickleResult<Vec<Value>> {
        let at = self
            .marks
            .pop()
            .ok_or(PickleError::UnmatchedMark(self.pos))?;
        Ok(self.stack.split_off(at))
    }

    fn top_mut(&mut self, offset: usize) -> PickleResult<&mut Value> {
        if self.stack.len() <= self.floor() {
            return Err(PickleError::StackUnderflow(offset));
        }
        self.stack
            .last_mut()
            .ok_or(PickleError::StackUnderflow(offset))
    }

    fn top_list(&mut self, offset: usize) -> PickleResult<&mut Vec<Value>> {
        match self.top_mut(offset)? {
            Value::List(items) => Ok(items),
            other => Err(PickleError::malformed(
                offset,
                format!("APPEND target is {}, not list", other.type_name()),
            )),
        }
    }

    fn top_dict(&mut self, offset: usize) -> PickleResult<&mut Vec<(Value, Value)>> {
        match self.top_mut(offset)? {
            Value::Dict(pairs) => Ok(pairs),
            other => Err(PickleError::malformed(
                offset,
                format!("SETITEM target is {}, not dict", other.type_name()),
            )),
        }
    }

    fn pop_args_tuple(&mut self, offset: usize) -> PickleResult<Vec<Value>> {
        match self.pop()? {
            Value::Tuple(items) => Ok(items),
            other => Err(PickleError::malformed(
                offset,
                format!("constructor arguments are {}, not tuple", other.type_name()),
            )),
        }
    }

    fn pop_callable(&mut self, offset: usize) -> PickleResult<AllowedGlobal> {
        match self.pop()? {
            Value::Global(global) => Ok(global),
            other => Err(PickleError::malformed(
                offset,
                format!("callee is {}, not a resolved global", other.type_name()),
            )),
        }
    }

    // --- memo -------------------------------------------------------------

    fn memo_put(&mut self, id: u32, offset: usize) -> PickleResult<()> {
        if self.memo.contains_key(&id) {
            return Err(PickleError::MemoRewritten(id));
        }
        if self.stack.len() <= self.floor() {
            return Err(PickleError::StackUnderflow(offset));
        }
        let top = match self.stack.last() {
            Some(value) => value.clone(),
            None => return Err(PickleError::StackUnderflow(offset)),
        };
        self.memo.insert(id, top);
        Ok(())
    }

    fn memo_get(&mut self, id: u32) -> PickleResult<()> {
        let value = self
            .memo
            .get(&id)
            .cloned()
            .ok_or(PickleError::MemoUnset(id))?;
        self.stack.push(value);
        Ok(())
    }

    // --- byte cursor ------------------------------------------------------

    fn take(&mut self, n: usize) -> PickleResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(PickleError::Truncated(self.pos))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_utf8(&mut self, n: usize, offset: usize) -> PickleResult<&'a str> {
        let bytes = self.take(n)?;
        std::str::from_utf8(bytes)
            .map_err(|_| PickleError::malformed(offset, "string is not valid UTF-8"))
    }

    fn read_u8(&mut self) -> PickleResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16le(&mut self) -> PickleResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_i32le(&mut self) -> PickleResult<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u32le(&mut self) -> PickleResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64le(&mut self) -> PickleResult<u64> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    fn read_len_u32(&mut self) -> PickleResult<usize> {
        let n = self.read_u32le()?;
        Ok(n as usize)
    }

    fn read_len_u64(&mut self, offset: usize) -> PickleResult<usize> {
        let n = self.read_u64le()?;
        usize::try_from(n).map_err(|_| PickleError::malformed(offset, "length exceeds usize"))
    }

    /// Read up to the next newline, excluding it, as UTF-8 text.
    fn read_line(&mut self) -> PickleResult<&'a str> {
        let rest = &self.data[self.pos..];
        let nl = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or(PickleError::Truncated(self.pos))?;
        let line = std::str::from_utf8(&rest[..nl])
            .map_err(|_| PickleError::malformed(self.pos, "line is not valid UTF-8"))?;
        self.pos += nl + 1;
        Ok(line)
    }
}

/// Record a constructor application without executing it.
///
/// The two container constructors become real containers so that the item
/// opcodes which follow them in checkpoint streams (SETITEMS onto an
/// OrderedDict instance, most commonly) have somewhere to land. Everything
/// else stays an opaque [`Value::Object`] record.
fn apply_constructor(ctor: AllowedGlobal, args: Vec<Value>) -> Value {
    match ctor {
        AllowedGlobal::OrderedDict => Value::Dict(Vec::new()),
        AllowedGlobal::BuiltinSet => {
            let items = match args.into_iter().next() {
                Some(Value::List(items) | Value::Tuple(items) | Value::Set(items)) => items,
                _ => Vec::new(),
            };
            Value::Set(items)
        }
        ctor => Value::Object { ctor, args },
    }
}

fn resolve_global(module: &str, name: &str) -> PickleResult<AllowedGlobal> {
    AllowedGlobal::resolve(module, name).ok_or_else(|| PickleError::ForbiddenGlobal {
        module: module.to_string(),
        name: name.to_string(),
    })
}

/// Decode a LONG1/LONG4 operand. Values that fit in an i64 become
/// [`Value::Int`]; anything wider (the legacy magic number, notably) is kept
/// verbatim as [`Value::BigInt`].
fn long_value(bytes: &[u8]) -> Value {
    match decode_long_le(bytes) {
        Some(n) => Value::Int(n),
        None => Value::BigInt(bytes.to_vec()),
    }
}

/// Decode a two's-complement little-endian integer as LONG1/LONG4 carry it.
/// `None` when the value does not fit in an i64.
fn decode_long_le(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() {
        return Some(0);
    }
    if bytes.len() > 8 {
        return None;
    }
    let negative = bytes[bytes.len() - 1] & 0x80 != 0;
    let mut buf = if negative { [0xffu8; 8] } else { [0u8; 8] };
    buf[..bytes.len()].copy_from_slice(bytes);
    Some(i64::from_le_bytes(buf))
}

fn into_pairs(mut items: Vec<Value>) -> Option<Vec<(Value, Value)>> {
    if items.len() % 2 != 0 {
        return None;
    }
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut drain = items.drain(..);
    while let (Some(key), Some(value)) = (drain.next(), drain.next()) {
        pairs.push((key, value));
    }
    Some(pairs)
}

/// Minimal protocol-0 STRING unquoting: matching quotes plus the escapes
/// repr() emits.
fn unquote(line: &str) -> Option<String> {
    let bytes = line.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let quote = bytes[0];
    if (quote != b'\'' && quote != b'"') || bytes[bytes.len() - 1] != quote {
        return None;
    }
    let inner = &line[1..line.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'x' => {
                let hi = chars.next()?.to_digit(16)?;
                let lo = chars.next()?.to_digit(16)?;
                out.push(char::from((hi * 16 + lo) as u8));
            }
            _ => return None,
        }
    }
    Some(out)
}
