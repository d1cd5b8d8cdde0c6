//! Address to name resolution
//!
//! Two tables are searched: built-in names for well known hardware, ROM and
//! zero-page addresses, and the `L_####` labels synthesized for every line of
//! the current listing. An address inside the decoded image only ever resolves
//! against the local table, so a program's own code always wins over a ROM
//! name that happens to share its address.
//!
//! Lookups walk backwards a few bytes from the requested address so that an
//! operand pointing into the middle of an instruction or a table still gets a
//! name (`L_0012 + 1`). Every hit is recorded, and only recorded symbols show
//! up in the external symbol block or as line labels.

use std::{
    collections::{HashMap, HashSet},
    io::BufRead,
};

use crate::{
    error::DisasmError,
    line::{byte_lit, word_lit},
};


/// How far back a built-in lookup may walk.
pub const BUILTIN_RANGE: u16 = 2;

/// How far back a local lookup may walk.
pub const LOCAL_RANGE: u16 = 3;

/// Width of the literal used when an address has no name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub text: String,
    pub found: bool,
}

/// Insertion ordered set of referenced base addresses.
#[derive(Debug, Default)]
struct Used {
    order: Vec<u16>,
    seen: HashSet<u16>,
}

impl Used {
    fn mark(&mut self, addr: u16) {
        if self.seen.insert(addr) {
            self.order.push(addr);
        }
    }

    fn contains(&self, addr: u16) -> bool {
        self.seen.contains(&addr)
    }

    fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

#[derive(Debug, Default)]
pub struct Symbols {
    builtin: HashMap<u16, String>,
    local: HashMap<u16, String>,
    used_builtin: Used,
    used_local: Used,
    // inclusive range of addresses that belong to the image
    local_span: Option<(u32, u32)>,
}

impl Symbols {
    /// No built-in names at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// The Commodore 64 BASIC, KERNAL, I/O and zero-page names.
    pub fn c64() -> Self {
        Self::with_builtins(
            C64_SYMBOLS
                .iter()
                .map(|(addr, name)| (*addr, name.to_string())),
        )
    }

    pub fn with_builtins<I: IntoIterator<Item = (u16, String)>>(builtins: I) -> Self {
        Self {
            builtin: builtins.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Merges more built-in names. Later names replace earlier ones.
    pub fn extend_builtins<I: IntoIterator<Item = (u16, String)>>(&mut self, builtins: I) {
        self.builtin.extend(builtins);
    }

    pub fn builtin(&self, addr: u16) -> Option<&str> {
        self.builtin.get(&addr).map(String::as_str)
    }

    pub fn local(&self, addr: u16) -> Option<&str> {
        self.local.get(&addr).map(String::as_str)
    }

    /// Tells the resolver which addresses the image occupies. A zero load
    /// address disables local resolution entirely.
    pub fn set_local_span(&mut self, load_address: u16, len: usize) {
        self.local_span = if load_address == 0 {
            None
        } else {
            let start = u32::from(load_address);
            Some((start, start + len as u32))
        };
    }

    pub fn is_local(&self, addr: u16) -> bool {
        match self.local_span {
            Some((start, end)) => (start..=end).contains(&u32::from(addr)),
            None => false,
        }
    }

    /// Address carrying `name`, local labels first.
    pub fn address_of(&self, name: &str) -> Option<u16> {
        self.local
            .iter()
            .chain(&self.builtin)
            .find_map(|(addr, label)| (label == name).then_some(*addr))
    }

    /// Drops local labels and every usage record.
    pub fn clear(&mut self) {
        self.local.clear();
        self.reset_used();
    }

    pub fn reset_used(&mut self) {
        self.used_builtin.clear();
        self.used_local.clear();
    }

    /// Names every given line address `L_####` by its position.
    pub fn rebuild_local<I: IntoIterator<Item = u16>>(&mut self, addresses: I) {
        self.clear();
        for (index, addr) in addresses.into_iter().enumerate() {
            self.local.insert(addr, format!("L_{index:04}"));
        }
    }

    pub fn resolve(&mut self, addr: u16, width: Width) -> Resolved {
        let (table, used, range) = if self.is_local(addr) {
            (&self.local, &mut self.used_local, LOCAL_RANGE)
        } else {
            (&self.builtin, &mut self.used_builtin, BUILTIN_RANGE)
        };
        match search(table, addr, range) {
            Some((base, back)) => {
                used.mark(base);
                let name = &table[&base];
                Resolved {
                    text: if back == 0 {
                        name.clone()
                    } else {
                        format!("{name} + {back}")
                    },
                    found: true,
                }
            }
            None => Resolved {
                text: match width {
                    Width::Byte => byte_lit(addr as u8),
                    Width::Word => word_lit(addr),
                },
                found: false,
            },
        }
    }

    /// Exact local label for a data value, recorded as used.
    pub fn local_exact(&mut self, value: u16) -> Option<String> {
        let name = self.local.get(&value)?.clone();
        self.used_local.mark(value);
        Some(name)
    }

    pub fn is_used_local(&self, addr: u16) -> bool {
        self.used_local.contains(addr)
    }

    /// Referenced built-in symbols, in the order they were first resolved.
    pub fn used_builtin(&self) -> impl Iterator<Item = (u16, &str)> + '_ {
        self.used_builtin
            .order
            .iter()
            .filter_map(|addr| self.builtin(*addr).map(|name| (*addr, name)))
    }

    /// Referenced local labels, in the order they were first resolved.
    pub fn used_local(&self) -> impl Iterator<Item = (u16, &str)> + '_ {
        self.used_local
            .order
            .iter()
            .filter_map(|addr| self.local(*addr).map(|name| (*addr, name)))
    }

    /// The block that heads an exported source: one `NAME = $ADDR` line per
    /// referenced built-in symbol by address, a blank line, then the origin.
    pub fn external_listing(&self, load_address: u16) -> Vec<String> {
        let mut used = self.used_builtin().collect::<Vec<_>>();
        used.sort_by_key(|(addr, _)| *addr);
        let mut lines = used
            .into_iter()
            .map(|(addr, name)| {
                let lit = if addr & 0xFF00 != 0 {
                    word_lit(addr)
                } else {
                    byte_lit(addr as u8)
                };
                format!("{:10}{name} = {lit}", "")
            })
            .collect::<Vec<_>>();
        lines.push(String::new());
        lines.push(format!("{:10}.ORG {}", "", word_lit(load_address)));
        lines
    }
}

/// Nearest named address at or below `addr`, at most `range` bytes back.
fn search(table: &HashMap<u16, String>, addr: u16, range: u16) -> Option<(u16, u16)> {
    (0..=range).find_map(|back| {
        let base = addr.checked_sub(back)?;
        table.contains_key(&base).then_some((base, back))
    })
}

/// Parses a symbol file of `LABEL:ADDR` lines with hex addresses.
pub fn parse_sym_file<R: BufRead>(reader: R) -> Result<Vec<(u16, String)>, DisasmError> {
    let mut symbols = Vec::new();
    for (line_no, line_result) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line_result.map_err(|e| DisasmError::SymFile {
            line: line_no,
            reason: e.to_string(),
        })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (label, addr) = line.split_once(':').ok_or_else(|| DisasmError::SymFile {
            line: line_no,
            reason: "malformed entry".to_string(),
        })?;
        let addr = u16::from_str_radix(addr.trim().trim_start_matches('$'), 16).map_err(|e| {
            DisasmError::SymFile {
                line: line_no,
                reason: e.to_string(),
            }
        })?;
        symbols.push((addr, label.trim().to_string()));
    }
    Ok(symbols)
}

#[rustfmt::skip]
const C64_SYMBOLS: &[(u16, &str)] = &[
    (0x0000, "D6510"),
    (0x0001, "R6510"),
    (0x0002, "UNUSED1"),
    (0x0003, "ADRAY1"),
    (0x0005, "ADRAY2"),
    (0x0007, "CHARAC"),
    (0x0008, "ENDCHAR"),
    (0x0009, "TRMPOS"),
    (0x000A, "VERCK"),
    (0x000B, "COUNT"),
    (0x000C, "DIMFLG"),
    (0x000D, "VALTYP"),
    (0x000E, "INTFLG"),
    (0x000F, "GARBFLG"),
    (0x0010, "SUBFLG"),
    (0x0011, "INPFLG"),
    (0x0012, "TANSGN"),
    (0x0013, "CHANNL"),
    (0x0014, "LINNUM"),
    (0x0016, "TEMPPT"),
    (0x0017, "LASTPT"),
    (0x0019, "TEMPST"),
    (0x0022, "INDEX"),
    (0x0026, "RESHO"),
    (0x002B, "TXTTAB"),
    (0x002D, "VARTAB"),
    (0x002F, "ARYTAB"),
    (0x0031, "STREND"),
    (0x0033, "FRETOP"),
    (0x0035, "FRESPC"),
    (0x0037, "MEMSIZ"),
    (0x0039, "CURLIN"),
    (0x003B, "OLDLIN"),
    (0x003D, "OLDTXT"),
    (0x003F, "DATLIN"),
    (0x0041, "DATPTR"),
    (0x0043, "INPPTR"),
    (0x0045, "VARNAM"),
    (0x0047, "VARPNT"),
    (0x0049, "FORPNT"),
    (0x004B, "OPPTR"),
    (0x004D, "OPMASK"),
    (0x004E, "DEFPNT"),
    (0x0050, "DSCPNT"),
    (0x0053, "FOUR6"),
    (0x0054, "JMPER"),
    (0x0057, "UNUSED2"),
    (0x0061, "FAC1"),
    (0x0062, "FACHO"),
    (0x0066, "FACSSGN"),
    (0x0067, "SGNFLG"),
    (0x0068, "BITS"),
    (0x0069, "FAC2"),
    (0x006A, "ARGHO"),
    (0x006E, "ARGSGN"),
    (0x0070, "FACOV"),
    (0x0071, "FBUFPTR"),
    (0x0073, "CHRGET"),
    (0x007A, "TXTPTR"),
    (0x008B, "RNDX"),
    (0x0090, "STATUS"),
    (0x0091, "STKEY"),
    (0x0092, "SVXT"),
    (0x0093, "VERCK2"),
    (0x0094, "C3PO"),
    (0x0095, "BSOUR"),
    (0x0096, "SYNO"),
    (0x0097, "XSAV"),
    (0x0098, "LDTND"),
    (0x0099, "DFLTN"),
    (0x009A, "DFLTO"),
    (0x009B, "PRTY"),
    (0x009C, "DPSW"),
    (0x009D, "MSGFLG"),
    (0x009E, "PTR1"),
    (0x009F, "PTR2"),
    (0x00A0, "TIME"),
    (0x00A3, "TMPDATA"),
    (0x00A5, "CNTDN"),
    (0x00A6, "BUFPNT"),
    (0x00A7, "INBIT"),
    (0x00A8, "BITCI"),
    (0x00A9, "RINONE"),
    (0x00AA, "RIDATA"),
    (0x00AB, "RIPRTY"),
    (0x00AC, "SAL"),
    (0x00AE, "EAL"),
    (0x00B0, "CMP0"),
    (0x00B2, "TAPE1"),
    (0x00B4, "BITTS"),
    (0x00B5, "NXTBIT"),
    (0x00B6, "RODATA"),
    (0x00B7, "FNLEN"),
    (0x00B8, "LA"),
    (0x00B9, "SA"),
    (0x00BA, "FA"),
    (0x00BB, "FNADR"),
    (0x00BD, "ROPRTY"),
    (0x00BE, "FSBLK"),
    (0x00BF, "MYCH"),
    (0x00C0, "CAS1"),
    (0x00C1, "STAL"),
    (0x00C3, "MEMUSS"),
    (0x00C5, "LSTX"),
    (0x00C6, "NDX"),
    (0x00C7, "RVS"),
    (0x00C8, "INDX"),
    (0x00C9, "LXSP"),
    (0x00CB, "SFDX"),
    (0x00CC, "BLNSW"),
    (0x00CD, "BLNCT"),
    (0x00CE, "GDBLN"),
    (0x00CF, "BLNON"),
    (0x00D0, "CRSW"),
    (0x00D1, "PNT"),
    (0x00D3, "PNTR"),
    (0x00D4, "QTSW"),
    (0x00D5, "LNMX"),
    (0x00D6, "TBLX"),
    (0x00D7, "UNUSED3"),
    (0x00D8, "INSRT"),
    (0x00D9, "LDTB1"),
    (0x00F3, "USER"),
    (0x00F5, "KEYTAB"),
    (0x00F7, "RIBUF"),
    (0x00F9, "ROBUF"),
    (0x00FB, "FREKZP"),
    (0x00FF, "BASZPT"),
    (0x0277, "KEYD"),
    (0x0286, "TEXT"),
    (0x0300, "IERROR"),
    (0x0302, "IMAIN"),
    (0x0308, "IGONE"),
    (0xA00C, "STMDSP"),
    (0xA052, "FUNDSPTABLE"),
    (0xA080, "OPTAB"),
    (0xA09E, "RESLST"),
    (0xA19E, "ERRTAB"),
    (0xA38A, "FNDFOR"),
    (0xA3B8, "BLTU"),
    (0xA3FB, "GETSTK"),
    (0xA408, "REASON"),
    (0xA435, "OMERR"),
    (0xA437, "ERROR"),
    (0xA474, "READY"),
    (0xA480, "MAIN"),
    (0xA49C, "MAIN1"),
    (0xA533, "LINKPRG"),
    (0xA560, "INLIN"),
    (0xA579, "CRUNCH"),
    (0xA613, "FNDLIN"),
    (0xA642, "SCRTCH"),
    (0xA65E, "CLEAR"),
    (0xA68E, "RUNC"),
    (0xA69C, "LIST"),
    (0xA717, "QPLOP"),
    (0xA742, "FOR"),
    (0xA7AE, "NEWSTT"),
    (0xA7E4, "GONE"),
    (0xA81D, "RESTOR_"),
    (0xA82F, "STOP"),
    (0xA831, "END"),
    (0xA857, "CONT"),
    (0xA871, "RUN"),
    (0xA883, "GOSUB"),
    (0xA8A0, "GOTO"),
    (0xA8D2, "RETURN"),
    (0xA8F8, "DATA"),
    (0xA906, "DATAN"),
    (0xA928, "IF"),
    (0xA93B, "REM"),
    (0xA94B, "ONGOTO"),
    (0xA96B, "LINGET"),
    (0xA9A5, "LET"),
    (0xAA80, "PRINTN"),
    (0xAA86, "CMD"),
    (0xAAA0, "PRINT"),
    (0xAB1E, "STROUT"),
    (0xAB7B, "GET"),
    (0xABA5, "DOAGAIN"),
    (0xABBF, "INPUT"),
    (0xAC06, "READ"),
    (0xACFC, "EXIFNT"),
    (0xAD1D, "NEXT"),
    (0xAD8A, "FRMNUM"),
    (0xAD9E, "FRMEVL"),
    (0xAE83, "EVAL"),
    (0xAEA8, "PIVAL"),
    (0xAEF1, "PARCHK"),
    (0xAEF7, "CHKCLS"),
    (0xAEFA, "CHKOPN"),
    (0xAEFF, "CHKCOM"),
    (0xAF08, "SNERR"),
    (0xAF2B, "ISVAR"),
    (0xAFA7, "ISFUN"),
    (0xAFE6, "OROP"),
    (0xAFE9, "ANDOP"),
    (0xB016, "DORE1"),
    (0xB081, "DIM"),
    (0xB08B, "PTRGET"),
    (0xB11D, "NOTFNS"),
    (0xB185, "FINPTR"),
    (0xB194, "ARYGET"),
    (0xB1A5, "N32768"),
    (0xB1B2, "INTIDX"),
    (0xB1BF, "AYINT"),
    (0xB1D1, "ISARY"),
    (0xB245, "BSERR"),
    (0xB248, "FCERR"),
    (0xB34C, "UMULT"),
    (0xB37D, "FRE"),
    (0xB391, "GIVAYF"),
    (0xB39E, "POS"),
    (0xB3A6, "ERRDIR"),
    (0xB3B3, "DEF"),
    (0xB3E1, "GETFNM"),
    (0xB3F4, "FBDOER"),
    (0xB465, "STRD"),
    (0xB487, "STRLIT"),
    (0xB4F4, "GETSPA"),
    (0xB536, "GARBAG"),
    (0xB63D, "CAT"),
    (0xB67A, "MOVINS"),
    (0xB6A3, "FRESTR"),
    (0xB6DB, "FRETMS"),
    (0xB6EC, "CHRD"),
    (0xB700, "LEFTD"),
    (0xB72C, "RIGHTD"),
    (0xB737, "MIDD"),
    (0xB761, "PREAM"),
    (0xB77C, "LEN"),
    (0xB78B, "ASC"),
    (0xB79B, "GETBYTC"),
    (0xB7AD, "VAL"),
    (0xB7EB, "GETNUM"),
    (0xB7F7, "GETADR"),
    (0xB80D, "PEEK"),
    (0xB824, "POKE"),
    (0xB82D, "FUWAIT"),
    (0xB849, "FADDH"),
    (0xB850, "FSUB"),
    (0xB853, "FSUBT"),
    (0xB867, "FADD"),
    (0xB86A, "FADDT"),
    (0xB8A7, "FADD4"),
    (0xB8FE, "NORMAL"),
    (0xB947, "NEGFAC"),
    (0xB97E, "OVERR"),
    (0xB983, "MULSHF"),
    (0xB9BC, "FONE"),
    (0xB9C1, "LOGCN2"),
    (0xB9EA, "LOG"),
    (0xBA28, "FMULT"),
    (0xBA33, "FMULT1"),
    (0xBA59, "MLTPLY"),
    (0xBA79, "TENC"),
    (0xBA8C, "CONUPK"),
    (0xBAB7, "MULDIV"),
    (0xBAD4, "MLDVEX"),
    (0xBAE2, "MUL10"),
    (0xBAFE, "DIV10"),
    (0xBB0F, "FDIV"),
    (0xBB12, "FDIVT"),
    (0xBBA2, "MOVFM"),
    (0xBBC7, "MOV2F"),
    (0xBBFC, "MOVFA"),
    (0xBC0C, "MOVAF"),
    (0xBC0F, "MOVEF"),
    (0xBC1B, "ROUND"),
    (0xBC2B, "SIGN"),
    (0xBC39, "SGN"),
    (0xBC58, "ABS"),
    (0xBC9B, "QINT"),
    (0xBCCC, "INT"),
    (0xBCF3, "FIN"),
    (0xBD7E, "FINLOG"),
    (0xBDC0, "N0999"),
    (0xBDCD, "LINPRT"),
    (0xBDDD, "FOUT"),
    (0xBF11, "FHALF"),
    (0xBF1C, "FOUTBL"),
    (0xBF3A, "FDCEND"),
    (0xBF71, "SQR"),
    (0xBF7B, "FPWRT"),
    (0xBFB4, "NEGOP"),
    (0xBFBF, "EXPCON"),
    (0xBFED, "EXP"),
    (0xD020, "BORDER"),
    (0xD021, "SCREENC"),
    (0xDC0D, "CIAICR"),
    (0xDC0E, "CIACRA"),
    (0xDD0D, "CI2ICR"),
    (0xDD0E, "CI2CRA"),
    (0xE043, "POLY1"),
    (0xE059, "POLY2"),
    (0xE08D, "RMULC"),
    (0xE092, "RADDC"),
    (0xE097, "RND"),
    (0xE12A, "SYS"),
    (0xE156, "SAVE"),
    (0xE165, "VERIFY"),
    (0xE168, "LOAD_"),
    (0xE1BE, "OPEN"),
    (0xE1C7, "CLOSE"),
    (0xE264, "COS"),
    (0xE26B, "SIN"),
    (0xE2B4, "TAN"),
    (0xE2E0, "PI2"),
    (0xE2E5, "TWOPI"),
    (0xE2EA, "FR4"),
    (0xE2EF, "SINCON"),
    (0xE30E, "ATN"),
    (0xE33E, "ATNCON"),
    (0xE37B, "WARM"),
    (0xE394, "COLD"),
    (0xE3A2, "INITAT"),
    (0xE3BF, "INIT"),
    (0xE460, "WORDS"),
    (0xE500, "IOBASE"),
    (0xE505, "SCREEN"),
    (0xE50A, "PLOT"),
    (0xE5B4, "LP2"),
    (0xEA87, "SCNKEY"),
    (0xED09, "TALK"),
    (0xED0C, "LISTEN"),
    (0xEDB9, "SECOND"),
    (0xEDC7, "TKSA"),
    (0xEDDD, "CIOUT"),
    (0xEDFE, "UNTLK"),
    (0xEE13, "ACPTR"),
    (0xF13E, "GETIN"),
    (0xF157, "CHRIN"),
    (0xF1CA, "_CHROUT"),
    (0xFF8A, "RESTOR"),
    (0xFFBA, "SETLFS"),
    (0xFFBD, "SETNAM"),
    (0xFFD2, "CHROUT"),
    (0xFFD5, "LOAD"),
];
