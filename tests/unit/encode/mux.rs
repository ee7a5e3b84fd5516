use super::*;

#[test]
fn default_args_match_fixed_codec_settings() {
    let args: Vec<String> = MuxOpts::default()
        .args(
            Path::new("v.silent.mp4"),
            Path::new("song.mp3"),
            Path::new("out.mp4"),
        )
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let joined = args.join(" ");
    assert!(joined.starts_with("-y "));
    assert!(joined.contains("-i v.silent.mp4 -i song.mp3"));
    assert!(joined.contains("-c:v libx264 -preset medium -crf 23"));
    assert!(joined.contains("-c:a aac -b:a 192k"));
    assert!(args.iter().any(|a| a == "-shortest"));
    assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
}

#[test]
fn no_overwrite_and_no_shortest() {
    let opts = MuxOpts {
        overwrite: false,
        shortest: false,
        ..MuxOpts::default()
    };
    let args = opts.args(Path::new("a"), Path::new("b"), Path::new("c"));
    assert_eq!(args[0], "-n");
    assert!(!args.iter().any(|a| a == "-shortest"));
}

#[test]
fn intermediate_sits_next_to_output() {
    assert_eq!(
        intermediate_path_for(Path::new("/tmp/out/song.mp4")),
        PathBuf::from("/tmp/out/song.silent.mp4")
    );
    assert_eq!(
        intermediate_path_for(Path::new("video")),
        PathBuf::from("video.silent.mp4")
    );
}

#[test]
fn cancelled_before_start_returns_cancelled() {
    if !is_ffmpeg_on_path() {
        return;
    }
    let flag = CancelFlag::new();
    flag.cancel();
    let out = std::env::temp_dir().join(format!("lyricframe_mux_cancel_{}.mp4", std::process::id()));
    let err = mux_audio(
        Path::new("/no/such/video.mp4"),
        Path::new("/no/such/audio.wav"),
        &out,
        &MuxOpts::default(),
        Some(&flag),
    )
    .unwrap_err();
    assert!(matches!(err, LyricframeError::Cancelled));
}

#[test]
fn missing_inputs_are_an_encoding_error() {
    if !is_ffmpeg_on_path() {
        return;
    }
    let out = std::env::temp_dir().join(format!("lyricframe_mux_missing_{}.mp4", std::process::id()));
    let err = mux_audio(
        Path::new("/no/such/video.mp4"),
        Path::new("/no/such/audio.wav"),
        &out,
        &MuxOpts::default(),
        None,
    )
    .unwrap_err();
    match err {
        LyricframeError::Encoding { intermediate, .. } => {
            assert_eq!(intermediate, PathBuf::from("/no/such/video.mp4"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
