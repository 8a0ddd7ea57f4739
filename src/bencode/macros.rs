// a macro to be used in tests to reduce boilerplate code
// informal syntax:
// -integer: as-is, works for (u8, u16, u32, i8, i16, i32, i64), conversion should be lossless
// -string: as-is, becomes a byte string
// -bytes: (b1, b2, ...), support trailing comma
// -list: [e1, e2, ...], support trailing comma
// -dictionary: { (k1, v1), (k2, v2), ... }, keys are string literals,
//  support trailing comma (no trailing comma in K-V pair)
// -values spanning multiple token trees (negative literals, method
//  calls) must be parenthesized, e.g. (-42); they are converted
//  through `From` instead of the structural rules
#[macro_export]
macro_rules! bencode_elem {
    ([ $( $element:tt ),* ]) => {
        $crate::bencode::BencodeElem::List(vec![ $( bencode_elem!($element) ),* ])
    };
    ([ $( $element:tt ),+ ,]) => {
        bencode_elem!([ $( $element ),* ])
    };
    (( $( $element:tt ),* )) => {
        $crate::bencode::BencodeElem::Bytes(vec![ $( $element ),* ])
    };
    (( $( $element:tt ),+ ,)) => {
        bencode_elem!(( $( $element ),* ))
    };
    ({ $( ($key:tt, $val:tt) ),* }) => {
        $crate::bencode::BencodeElem::Dictionary(
            vec![ $( ($key.as_bytes().to_vec(), bencode_elem!($val)) ),* ]
                .into_iter()
                .collect(),
        )
    };
    ({ $( ($key:tt, $val:tt) ),+ ,}) => {
        bencode_elem!({ $( ($key, $val) ),* })
    };
    ($other:expr) => {
        $crate::bencode::BencodeElem::from($other)
    }
}
