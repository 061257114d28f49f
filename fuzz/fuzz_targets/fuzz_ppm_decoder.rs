//! Fuzz target: `Photo::from_ppm`
//!
//! Capture replies come from another process.  Whatever it writes, the
//! decoder must either refuse it or yield a photo whose buffer matches its
//! dimensions.
//!
//! cargo fuzz run fuzz_ppm_decoder

#![no_main]

use firewatch::vision::photo::Photo;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(photo) = Photo::from_ppm(data) {
        assert!(photo.validate().is_ok());
        assert_eq!(photo.rgb.len(), photo.pixel_count() * 3);
    }
});
