//! Curated example prompt/configuration pairs.
//!
//! Served as the static `videos://templates` and `images://templates`
//! resources. Pure data.

use serde_json::json;

pub fn video_templates() -> serde_json::Value {
    json!([
        {
            "name": "Cinematic drone shot",
            "prompt": "Aerial drone shot sweeping over a rugged coastline at golden hour, waves crashing against cliffs",
            "config": { "aspectRatio": "16:9", "durationSeconds": 8 }
        },
        {
            "name": "Product reveal",
            "prompt": "Slow dolly-in on a sleek wristwatch rotating on a dark pedestal, dramatic studio lighting",
            "config": { "aspectRatio": "16:9", "durationSeconds": 5 }
        },
        {
            "name": "Vertical nature loop",
            "prompt": "Close-up of rain falling on broad jungle leaves, soft bokeh background, looping motion",
            "config": { "aspectRatio": "9:16", "durationSeconds": 6 }
        },
        {
            "name": "Stylized animation",
            "prompt": "A paper-craft fox running through a stop-motion forest, handmade texture, warm colors",
            "config": { "aspectRatio": "16:9", "durationSeconds": 7, "personGeneration": "dont_allow" }
        }
    ])
}

pub fn image_templates() -> serde_json::Value {
    json!([
        {
            "name": "Photorealistic portrait backdrop",
            "prompt": "Empty photography studio with a seamless slate-gray backdrop and soft key lighting",
            "config": { "numberOfImages": 1 }
        },
        {
            "name": "Isometric illustration",
            "prompt": "Isometric illustration of a cozy coffee shop interior, pastel palette, clean vector style",
            "config": { "numberOfImages": 2 }
        },
        {
            "name": "Concept art",
            "prompt": "Concept art of a floating market city at dawn, painterly style, volumetric light",
            "config": { "numberOfImages": 4 }
        }
    ])
}
