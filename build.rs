// 构建脚本: 启用 ffmpeg 功能时链接FFmpeg依赖库
use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if env::var_os("CARGO_FEATURE_FFMPEG").is_none() {
        return;
    }

    // 仅在Windows MSVC环境下补充系统库
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_env = env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();
    if target_os == "windows" && target_env == "msvc" {
        // OLE 自动化和VFW (dshow 摄像头)
        println!("cargo:rustc-link-lib=dylib=oleaut32");
        println!("cargo:rustc-link-lib=dylib=vfw32");

        // Secure Channel (RTSP over TLS)
        println!("cargo:rustc-link-lib=dylib=secur32");
    }
}
