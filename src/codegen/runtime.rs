//! Runtime support spliced into every emitted module: a prototype
//! bump-pointer allocator and the string comparison helper. Strings are
//! length-prefixed (4 bytes, little endian) and passed by address.

/// The allocator rounds each allocation up to 8 bytes and never frees.
pub const ALLOC: &str = r#"(func $__alloc (param $size i32) (result i32)
  (local $ptr i32)
  global.get $__hp
  local.set $ptr
  global.get $__hp
  local.get $size
  i32.add
  i32.const 7
  i32.add
  i32.const -8
  i32.and
  global.set $__hp
  local.get $ptr)"#;

/// Lexicographic comparison of two length-prefixed strings; returns -1,
/// 0 or 1.
pub const STR_CMP: &str = r#"(func $__str_cmp (param $a i32) (param $b i32) (result i32)
  (local $la i32)
  (local $lb i32)
  (local $i i32)
  (local $ca i32)
  (local $cb i32)
  local.get $a
  i32.load
  local.set $la
  local.get $b
  i32.load
  local.set $lb
  i32.const 0
  local.set $i
  block $done
    loop $next
      local.get $i
      local.get $la
      i32.eq
      local.get $i
      local.get $lb
      i32.eq
      i32.or
      br_if $done
      local.get $a
      local.get $i
      i32.add
      i32.load8_u offset=4
      local.set $ca
      local.get $b
      local.get $i
      i32.add
      i32.load8_u offset=4
      local.set $cb
      local.get $ca
      local.get $cb
      i32.ne
      if
        local.get $ca
        local.get $cb
        i32.lt_u
        if
          i32.const -1
          return
        end
        i32.const 1
        return
      end
      local.get $i
      i32.const 1
      i32.add
      local.set $i
      br $next
    end
  end
  local.get $la
  local.get $lb
  i32.lt_u
  if
    i32.const -1
    return
  end
  local.get $la
  local.get $lb
  i32.gt_u
  if
    i32.const 1
    return
  end
  i32.const 0)"#;
